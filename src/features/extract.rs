// Feature extractor: one raw record in, one ordered feature vector out.
//
// The same extractor instance serves both bulk dataset preparation and
// single-request scoring, which is what keeps training and serving in step.
// Every feature is computed once into the full current layout; older
// layouts are projections of it by name.
//
// Defaults for missing fields:
// - counts, flags, text-derived values: 0
// - following count absent or 0: treated as 1 in the follower ratio
// - account age 0: treated as 1 in posts-per-day
// - unparsable timestamps: treated as absent

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::layout::{self, FeatureSchema, FeatureVector, FEATURE_COUNT, FEATURE_VERSION};
use super::record::{RawField, RawRecord};
use super::sentiment::{LexiconScorer, SentimentScorer};
use super::{temporal, text};

/// Extracts feature vectors from raw records.
///
/// The reference time used for account-age derivation is pinned when the
/// extractor is built, so repeated extraction of the same record is
/// bit-identical for the lifetime of the instance.
#[derive(Clone)]
pub struct FeatureExtractor {
    sentiment: Arc<dyn SentimentScorer>,
    reference_time: DateTime<Utc>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LexiconScorer))
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("sentiment", &self.sentiment.name())
            .field("reference_time", &self.reference_time)
            .finish()
    }
}

impl FeatureExtractor {
    pub fn new(sentiment: Arc<dyn SentimentScorer>) -> Self {
        Self {
            sentiment,
            reference_time: Utc::now(),
        }
    }

    /// Pin "now" explicitly (tests, backfills).
    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = reference_time;
        self
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time
    }

    pub fn sentiment_name(&self) -> &'static str {
        self.sentiment.name()
    }

    /// Schema produced by `extract`.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::current()
    }

    /// Extract the current layout.
    pub fn extract(&self, record: &RawRecord) -> FeatureVector {
        let values = self.compute(record).to_vec();
        FeatureVector::from_values(FEATURE_VERSION, values)
            .unwrap_or_else(|| unreachable!("compute() fills the current layout"))
    }

    /// Extract the layout of a registered schema version by projecting the
    /// current vector by name. Every registered layout is a subset of the
    /// current one. Callers validate `schema` first; an unregistered version
    /// gets the current layout.
    pub fn extract_for(&self, record: &RawRecord, schema: &FeatureSchema) -> FeatureVector {
        let full = self.extract(record);
        match layout::layout_for(schema.version) {
            Some(names) if schema.version != FEATURE_VERSION => {
                let values = names
                    .iter()
                    .map(|name| full.get(name).unwrap_or(0.0))
                    .collect();
                FeatureVector::from_values(schema.version, values).unwrap_or(full)
            }
            _ => full,
        }
    }

    /// All current features, in FEATURE_LAYOUT order.
    fn compute(&self, record: &RawRecord) -> [f64; FEATURE_COUNT] {
        let tweet = record.text(RawField::Tweet).unwrap_or_default();
        let hashtags = record.text(RawField::Hashtags).unwrap_or_default();
        let username = record.text(RawField::Username).unwrap_or_default();

        let followers = record.number(RawField::FollowerCount).unwrap_or(0.0);
        let following = nonzero_or_one(record.number(RawField::FollowingCount));

        let account_age = self.account_age_days(record);
        let statuses = record.number(RawField::StatusesCount).unwrap_or(0.0);
        let tweets_per_day = statuses / nonzero_or_one(Some(account_age));

        let posted_at = record
            .text(RawField::CreatedAt)
            .and_then(|s| temporal::parse_timestamp(&s));
        let (hour, weekday) = posted_at
            .map(|ts| (temporal::hour_of(&ts), temporal::day_of_week(&ts)))
            .unwrap_or((0, 0));

        let verified = record.flag(RawField::Verified).unwrap_or(false);

        [
            record.number(RawField::RetweetCount).unwrap_or(0.0),
            record.number(RawField::MentionCount).unwrap_or(0.0),
            followers,
            if verified { 1.0 } else { 0.0 },
            text::char_length(&tweet) as f64,
            text::hashtag_count(&hashtags) as f64,
            followers / following,
            account_age,
            tweets_per_day,
            self.sentiment.polarity(&tweet).clamp(-1.0, 1.0),
            text::unique_word_ratio(&tweet),
            text::emoji_count(&tweet) as f64,
            text::url_count(&tweet) as f64,
            text::count_char(&tweet, '!') as f64,
            text::count_char(&tweet, '?') as f64,
            text::uppercase_ratio(&tweet),
            f64::from(hour),
            f64::from(weekday),
            text::char_length(&username) as f64,
            text::digit_ratio(&username),
        ]
    }

    /// Direct field if present, else derived from the creation date, else 0.
    fn account_age_days(&self, record: &RawRecord) -> f64 {
        if let Some(days) = record.number(RawField::AccountAgeDays) {
            return days;
        }
        record
            .text(RawField::AccountCreationDate)
            .and_then(|s| temporal::parse_instant(&s))
            .map(|created| temporal::days_between(&created, &self.reference_time) as f64)
            .unwrap_or(0.0)
    }
}

/// Divisor guard: absent or zero becomes 1.
fn nonzero_or_one(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v != 0.0 => v,
        _ => 1.0,
    }
}
