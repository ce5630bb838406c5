use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::features::{FeatureExtractor, LexiconScorer, NeutralScorer, SentimentScorer};

/// Which sentiment scorer feeds the Sentiment feature.
#[derive(Debug, Clone, PartialEq)]
pub enum SentimentBackend {
    /// Built-in lexicon scorer (default)
    Lexicon,
    /// Always 0; keeps the layout but switches the feature off
    Neutral,
}

impl SentimentBackend {
    /// Backend for a configured name, case-insensitive.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(SentimentBackend::Lexicon),
            "neutral" => Ok(SentimentBackend::Neutral),
            _ => anyhow::bail!(
                "BOTWATCH_SENTIMENT must be \"lexicon\" or \"neutral\", got {name:?}"
            ),
        }
    }

    pub fn scorer(&self) -> Arc<dyn SentimentScorer> {
        match self {
            SentimentBackend::Lexicon => Arc::new(LexiconScorer),
            SentimentBackend::Neutral => Arc::new(NeutralScorer),
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. CLI flags
/// override anything set here.
pub struct Config {
    /// CSV dataset used by `train`
    pub dataset_path: PathBuf,
    /// Directory for model.json, metrics.txt and diagnostics.json
    pub results_dir: PathBuf,
    /// Artifact served by `serve` and reloaded by POST /reload
    pub model_path: PathBuf,
    /// Seed for the train/test split and the forest
    pub seed: u64,
    pub sentiment: SentimentBackend,
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables. Everything has a
    /// default; malformed numbers and unknown sentiment backends are errors.
    pub fn load() -> Result<Self> {
        let results_dir = env::var("BOTWATCH_RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("results"));
        let model_path = env::var("BOTWATCH_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| results_dir.join("model.json"));

        let seed = match env::var("BOTWATCH_SEED") {
            Ok(s) => s
                .trim()
                .parse()
                .with_context(|| format!("BOTWATCH_SEED must be an integer, got {s:?}"))?,
            Err(_) => crate::dataset::split::DEFAULT_SEED,
        };
        let port = match env::var("BOTWATCH_PORT") {
            Ok(s) => s
                .trim()
                .parse()
                .with_context(|| format!("BOTWATCH_PORT must be a port number, got {s:?}"))?,
            Err(_) => 5000,
        };

        let sentiment = match env::var("BOTWATCH_SENTIMENT") {
            Ok(name) => SentimentBackend::from_name(&name)?,
            Err(_) => SentimentBackend::Lexicon,
        };

        Ok(Self {
            dataset_path: env::var("BOTWATCH_DATASET")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("bot_detection_data.csv")),
            results_dir,
            model_path,
            seed,
            sentiment,
            bind: env::var("BOTWATCH_BIND").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
        })
    }

    /// Extractor wired to the configured sentiment scorer.
    pub fn extractor(&self) -> FeatureExtractor {
        FeatureExtractor::new(self.sentiment.scorer())
    }

    /// Check that the training dataset exists.
    pub fn require_dataset(&self) -> Result<()> {
        if !self.dataset_path.exists() {
            anyhow::bail!(
                "Dataset not found at {}\n\
                 Pass --csv or set BOTWATCH_DATASET in your .env file.",
                self.dataset_path.display()
            );
        }
        Ok(())
    }

    /// Check that a trained model exists.
    pub fn require_model(&self) -> Result<()> {
        if !self.model_path.exists() {
            anyhow::bail!(
                "Model artifact not found at {}\n\
                 Run `botwatch train` first, or pass --model / set BOTWATCH_MODEL_PATH.",
                self.model_path.display()
            );
        }
        Ok(())
    }
}
