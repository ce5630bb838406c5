// Feature layout: the single source of truth for vector order.
//
// Rules:
// - Adding, removing or reordering a feature means a new layout version.
// - Old layouts stay registered so artifacts trained on them still load and
//   are scored with the matching projection.
// - A trained artifact carries its FeatureSchema; load compares it against
//   the registered layout for that version, name by name.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::SchemaMismatchError;

/// Layout version produced by `FeatureExtractor::extract`.
pub const FEATURE_VERSION: u32 = 2;

/// v1: the six features the first prediction API computed.
pub const LAYOUT_V1: &[&str] = &[
    "Retweet Count",
    "Mention Count",
    "Follower Count",
    "Verified",
    "Tweet_Length",
    "Hashtag_Count",
];

/// v2: the full account, text, temporal and username feature set.
pub const LAYOUT_V2: &[&str] = &[
    "Retweet Count",
    "Mention Count",
    "Follower Count",
    "Verified",
    "Tweet_Length",
    "Hashtag_Count",
    "Follower_Following_Ratio",
    "Account_Age_Days",
    "Tweets_Per_Day",
    "Sentiment",
    "Unique_Word_Ratio",
    "Emoji_Count",
    "URL_Count",
    "Exclamation_Count",
    "Question_Count",
    "Uppercase_Ratio",
    "Tweet_Hour",
    "Tweet_DayOfWeek",
    "Username_Length",
    "Username_Digit_Ratio",
];

/// Current layout (alias kept so call sites don't name a version).
pub const FEATURE_LAYOUT: &[&str] = LAYOUT_V2;

/// Width of the current layout.
pub const FEATURE_COUNT: usize = 20;

/// Every layout this build can extract, oldest first.
const REGISTRY: &[(u32, &[&str])] = &[(1, LAYOUT_V1), (2, LAYOUT_V2)];

/// Registered layout for a version, if this build knows it.
pub fn layout_for(version: u32) -> Option<&'static [&'static str]> {
    REGISTRY
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, layout)| *layout)
}

pub fn supported_versions() -> Vec<u32> {
    REGISTRY.iter().map(|(v, _)| *v).collect()
}

/// Position of a feature in the current layout.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// An ordered, versioned list of feature names. This is what an artifact
/// stores and what two feature vectors must share to be comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub names: Vec<String>,
}

impl FeatureSchema {
    pub fn current() -> Self {
        Self::from_layout(FEATURE_VERSION, FEATURE_LAYOUT)
    }

    /// Schema for a registered version.
    pub fn for_version(version: u32) -> Option<Self> {
        layout_for(version).map(|layout| Self::from_layout(version, layout))
    }

    fn from_layout(version: u32, layout: &[&str]) -> Self {
        Self {
            version,
            names: layout.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// CRC32 over version and names, for compact logging and comparison.
    pub fn layout_hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&self.version.to_le_bytes());
        for name in &self.names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize()
    }

    /// Check this schema against the registered layout for its version.
    /// Any difference (missing, extra or reordered names) is a mismatch;
    /// there is no padding, truncation or reordering.
    pub fn validate(&self) -> Result<(), SchemaMismatchError> {
        let expected =
            layout_for(self.version).ok_or_else(|| SchemaMismatchError::UnknownVersion {
                version: self.version,
                supported: supported_versions(),
            })?;

        if self.names.iter().map(String::as_str).eq(expected.iter().copied()) {
            return Ok(());
        }

        let missing: Vec<String> = expected
            .iter()
            .filter(|e| !self.names.iter().any(|n| n == *e))
            .map(|e| e.to_string())
            .collect();
        let unexpected: Vec<String> = self
            .names
            .iter()
            .filter(|n| !expected.contains(&n.as_str()))
            .cloned()
            .collect();
        let reordered = missing.is_empty() && unexpected.is_empty();

        Err(SchemaMismatchError::LayoutDiffers {
            version: self.version,
            missing,
            unexpected,
            reordered,
        })
    }
}

/// One extracted feature vector, tagged with the layout that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    version: u32,
    names: &'static [&'static str],
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pairs `values` with a registered layout. Returns None if the version
    /// is unknown or the widths differ.
    pub fn from_values(version: u32, values: Vec<f64>) -> Option<Self> {
        let names = layout_for(version)?;
        (names.len() == values.len()).then_some(Self {
            version,
            names,
            values,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }

    /// (name, value) pairs in layout order.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.names.iter().copied().zip(self.values.iter().copied())
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::from_layout(self.version, self.names)
    }

    /// JSON object of name → value, for logging and debug output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "schema_version": self.version,
            "features": self
                .pairs()
                .map(|(n, v)| (n.to_string(), serde_json::json!(v)))
                .collect::<serde_json::Map<_, _>>(),
        })
    }
}
