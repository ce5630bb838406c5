// Raw input records and the field capability table.
//
// A RawRecord is whatever arrived: a CSV row or a JSON request body. Nothing
// about it is guaranteed. Fields may be missing, null, or numbers written as
// strings. Every logical field is looked up through FIELD_TABLE, which lists
// the accepted keys (dataset column name first, then API aliases) and how to
// read the value. The extractor only ever asks "is this field present, and
// what is it" through the accessors below, never by probing keys itself.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical raw fields the extractor and dataset preparer understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawField {
    Tweet,
    RetweetCount,
    MentionCount,
    FollowerCount,
    FollowingCount,
    Verified,
    Hashtags,
    AccountAgeDays,
    AccountCreationDate,
    StatusesCount,
    CreatedAt,
    Username,
    BotLabel,
}

/// How a field's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Count,
    Flag,
    Timestamp,
}

/// One row of the capability table.
#[derive(Debug)]
pub struct FieldSpec {
    pub field: RawField,
    pub keys: &'static [&'static str],
    pub kind: FieldKind,
}

/// The capability table. First key is the dataset column name.
pub const FIELD_TABLE: &[FieldSpec] = &[
    FieldSpec {
        field: RawField::Tweet,
        keys: &["Tweet", "tweet", "text"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: RawField::RetweetCount,
        keys: &["Retweet Count", "retweet_count", "retweets"],
        kind: FieldKind::Count,
    },
    FieldSpec {
        field: RawField::MentionCount,
        keys: &["Mention Count", "mention_count", "mentions"],
        kind: FieldKind::Count,
    },
    FieldSpec {
        field: RawField::FollowerCount,
        keys: &["Follower Count", "follower_count", "followers"],
        kind: FieldKind::Count,
    },
    FieldSpec {
        field: RawField::FollowingCount,
        keys: &["Following Count", "following_count", "following"],
        kind: FieldKind::Count,
    },
    FieldSpec {
        field: RawField::Verified,
        keys: &["Verified", "verified"],
        kind: FieldKind::Flag,
    },
    FieldSpec {
        field: RawField::Hashtags,
        keys: &["Hashtags", "hashtags"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: RawField::AccountAgeDays,
        keys: &["Account Age Days", "account_age_days"],
        kind: FieldKind::Count,
    },
    FieldSpec {
        field: RawField::AccountCreationDate,
        keys: &["Account Creation Date", "account_creation_date"],
        kind: FieldKind::Timestamp,
    },
    FieldSpec {
        field: RawField::StatusesCount,
        keys: &["Statuses Count", "statuses_count", "status_count"],
        kind: FieldKind::Count,
    },
    FieldSpec {
        field: RawField::CreatedAt,
        keys: &["Created At", "created_at"],
        kind: FieldKind::Timestamp,
    },
    FieldSpec {
        field: RawField::Username,
        keys: &["Username", "username"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: RawField::BotLabel,
        keys: &["Bot Label", "bot_label", "is_bot"],
        kind: FieldKind::Flag,
    },
];

impl RawField {
    /// FIELD_TABLE rows are declared in enum order.
    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_TABLE[self as usize]
    }

    /// The dataset column name for this field.
    pub fn column(self) -> &'static str {
        self.spec().keys[0]
    }

    /// The field a raw key belongs to, if any.
    pub fn for_key(key: &str) -> Option<RawField> {
        FIELD_TABLE
            .iter()
            .find(|spec| spec.keys.contains(&key))
            .map(|spec| spec.field)
    }
}

/// One raw input record: a loosely typed key/value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: Map<String, Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON value. Anything other than an object is
    /// rejected so callers can tell "empty record" from "wrong shape".
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(values) => Some(Self { values }),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy in tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// First non-null value under any of the field's accepted keys.
    fn lookup(&self, field: RawField) -> Option<&Value> {
        field
            .spec()
            .keys
            .iter()
            .filter_map(|k| self.values.get(*k))
            .find(|v| !v.is_null())
    }

    /// True when the field is present with a usable value for its kind.
    pub fn is_present(&self, field: RawField) -> bool {
        match field.spec().kind {
            FieldKind::Count => self.number(field).is_some(),
            FieldKind::Flag => self.flag(field).is_some(),
            FieldKind::Text | FieldKind::Timestamp => self.text(field).is_some(),
        }
    }

    /// Numeric value. Strings are parsed; NaN, infinities, empty strings and
    /// unparsable values count as absent.
    pub fn number(&self, field: RawField) -> Option<f64> {
        let n = match self.lookup(field)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Bool(b) => f64::from(u8::from(*b)),
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Boolean value. Accepts booleans, numbers (non-zero is true) and the
    /// usual spellings in either case.
    pub fn flag(&self, field: RawField) -> Option<bool> {
        match self.lookup(field)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(|f| f != 0.0),
            Value::String(s) => parse_flag(s),
            _ => None,
        }
    }

    /// Text value. Numbers and booleans are rendered as text, since a
    /// hashtag column of "2024" is still one token.
    pub fn text(&self, field: RawField) -> Option<Cow<'_, str>> {
        match self.lookup(field)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "bot" => Some(true),
        "false" | "no" | "n" | "0" | "human" => Some(false),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f != 0.0),
    }
}
