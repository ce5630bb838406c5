// Feature extraction: the contract shared by training and serving.
//
// record.rs holds the loosely typed input and the field capability table,
// layout.rs the versioned feature order, extract.rs the extractor itself.

pub mod extract;
pub mod layout;
pub mod record;
pub mod sentiment;
pub mod temporal;
pub mod text;

pub use extract::FeatureExtractor;
pub use layout::{FeatureSchema, FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use record::{RawField, RawRecord};
pub use sentiment::{LexiconScorer, NeutralScorer, SentimentScorer};
