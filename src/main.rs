use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use botwatch::config::Config;
use botwatch::features::{FeatureSchema, RawRecord};
use botwatch::model::ForestParams;
use botwatch::output::terminal;
use botwatch::pipeline::{self, GridOptions, TrainOptions};
use botwatch::service::PredictionService;
use botwatch::training::ParamGrid;

/// botwatch: bot-or-human classification for social media accounts.
///
/// Trains a random forest on labeled account/post data and serves
/// single-record predictions over HTTP.
#[derive(Parser)]
#[command(name = "botwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, evaluate and save a model from a labeled CSV dataset
    Train {
        /// Dataset CSV (default: BOTWATCH_DATASET)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Number of trees in the forest
        #[arg(long, default_value = "200")]
        n_estimators: usize,

        /// Maximum tree depth (default: unbounded)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Fraction of rows held out for testing
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Artifact file name inside the results directory
        #[arg(long, default_value = "model.json")]
        model_out: String,

        /// Metrics report file name inside the results directory
        #[arg(long, default_value = "metrics.txt")]
        metrics_out: String,

        /// Output directory (default: BOTWATCH_RESULTS_DIR)
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Pick tree count and depth by cross-validated grid search
        #[arg(long)]
        grid_search: bool,

        /// Tree counts to try (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "1000,5000,10000")]
        grid_trees: Vec<usize>,

        /// Max depths to try (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "30,40")]
        grid_depths: Vec<usize>,

        /// Cross-validation folds for grid search
        #[arg(long, default_value = "3")]
        cv_folds: usize,

        /// Collapse rows to one example per username before splitting
        #[arg(long)]
        aggregate_users: bool,

        /// Only use the first N rows of the dataset (0 uses every row)
        #[arg(long)]
        sample: Option<usize>,

        /// Seed for the split and the forest (default: BOTWATCH_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// Skip cross-validation, learning curve and validation curve
        #[arg(long)]
        skip_diagnostics: bool,
    },

    /// Score one record with a trained model
    Predict {
        /// Model artifact (default: BOTWATCH_MODEL_PATH)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Record as a JSON object
        #[arg(long, conflicts_with = "file")]
        json: Option<String>,

        /// File containing the record as a JSON object
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show a model artifact's schema and training metadata
    Inspect {
        /// Model artifact (default: BOTWATCH_MODEL_PATH)
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Print the current feature schema
    Schema,

    /// Serve predictions over HTTP
    #[cfg(feature = "web")]
    Serve {
        /// Model artifact (default: BOTWATCH_MODEL_PATH)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Port to listen on (default: BOTWATCH_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: BOTWATCH_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("botwatch=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            csv,
            n_estimators,
            max_depth,
            test_size,
            model_out,
            metrics_out,
            results_dir,
            grid_search,
            grid_trees,
            grid_depths,
            cv_folds,
            aggregate_users,
            sample,
            seed,
            skip_diagnostics,
        } => {
            let mut config = Config::load()?;
            if let Some(csv) = csv {
                config.dataset_path = csv;
            }
            config.require_dataset()?;

            let mut opts = TrainOptions::new(
                config.dataset_path.clone(),
                results_dir.unwrap_or_else(|| config.results_dir.clone()),
            );
            opts.params = ForestParams {
                n_trees: n_estimators,
                max_depth,
                seed: seed.unwrap_or(config.seed),
                ..ForestParams::default()
            };
            opts.test_fraction = test_size;
            opts.model_file = model_out;
            opts.metrics_file = metrics_out;
            opts.grid = grid_search.then(|| GridOptions {
                grid: ParamGrid {
                    n_trees: grid_trees,
                    max_depths: grid_depths.into_iter().map(Some).collect(),
                },
                folds: cv_folds,
            });
            opts.aggregate_by_entity = aggregate_users;
            opts.sample = sample.filter(|&n| n > 0);
            opts.skip_diagnostics = skip_diagnostics;
            opts.interactive = true;

            let cancel = Arc::new(AtomicBool::new(false));
            let flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping training (Ctrl-C again to exit now)");
                    flag.store(true, Ordering::SeqCst);
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Second interrupt, exiting");
                        std::process::exit(130);
                    }
                }
            });

            let extractor = config.extractor();
            let summary = tokio::task::spawn_blocking(move || {
                pipeline::train::run(&opts, &extractor, &cancel)
            })
            .await
            .context("Training task panicked")??;

            println!();
            println!(
                "{} {}",
                "Model saved:".green().bold(),
                summary.model_path.display()
            );
            println!("  Metrics:     {}", summary.metrics_path.display());
            println!("  Diagnostics: {}", summary.diagnostics_path.display());
            info!(state = %summary.state, "Training run complete");
        }

        Commands::Predict { model, json, file } => {
            let mut config = Config::load()?;
            if let Some(model) = model {
                config.model_path = model;
            }
            config.require_model()?;

            let raw = match (json, file) {
                (Some(json), _) => json,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("Pass the record with --json or --file"),
            };
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Record is not valid JSON")?;
            let record = RawRecord::from_json(value)
                .context("Record must be a JSON object of field names to values")?;

            let service = PredictionService::load(&config.model_path, config.extractor())?;
            let result = service.predict(&record);
            terminal::display_prediction(&result);
        }

        Commands::Inspect { model } => {
            let mut config = Config::load()?;
            if let Some(model) = model {
                config.model_path = model;
            }
            botwatch::status::show(&config.model_path)?;
        }

        Commands::Schema => {
            terminal::display_schema(&FeatureSchema::current());
            println!();
            println!(
                "{}",
                "Older schema versions remain loadable: ".dimmed().to_string()
                    + &botwatch::features::layout::supported_versions()
                        .iter()
                        .map(|v| format!("v{v}"))
                        .collect::<Vec<_>>()
                        .join(", ")
            );
        }

        #[cfg(feature = "web")]
        Commands::Serve { model, port, bind } => {
            let mut config = Config::load()?;
            if let Some(model) = model {
                config.model_path = model;
            }
            config.require_model()?;

            let service = PredictionService::load(&config.model_path, config.extractor())
                .with_context(|| {
                    format!("Cannot serve model at {}", config.model_path.display())
                })?;
            let state = botwatch::web::AppState::new(service, config.model_path.clone());
            botwatch::web::run_server(
                state,
                port.unwrap_or(config.port),
                bind.as_deref().unwrap_or(&config.bind),
            )
            .await?;
        }
    }

    Ok(())
}
