// Training pipeline: load → prepare → split → train → evaluate → report →
// persist.
//
// Drives the model lifecycle (Untrained → Training → Trained → Persisted).
// The cancellation flag is checked between phases and handed to every fit,
// so a request lands within one tree. A cancelled or failed run never writes
// an artifact.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::artifact::{self, GridSummary, ModelArtifact, TrainingMetadata};
use crate::dataset::{self, LabeledDataset};
use crate::error::TrainingError;
use crate::evaluation::{self, Diagnostics, EvaluationReport};
use crate::features::FeatureExtractor;
use crate::model::{Cancel, ForestParams};
use crate::output::report::{self, RunReport};
use crate::output::terminal;
use crate::status::ModelState;
use crate::training::{ModelTrainer, ParamGrid, TrainMode, TrainOutcome};

/// Grid search settings for a run.
#[derive(Debug, Clone)]
pub struct GridOptions {
    pub grid: ParamGrid,
    pub folds: usize,
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub csv: PathBuf,
    pub params: ForestParams,
    pub test_fraction: f64,
    pub results_dir: PathBuf,
    pub model_file: String,
    pub metrics_file: String,
    pub diagnostics_file: String,
    pub grid: Option<GridOptions>,
    pub aggregate_by_entity: bool,
    pub sample: Option<usize>,
    pub skip_diagnostics: bool,
    /// Terminal output (tables, progress bar). Off in tests.
    pub interactive: bool,
}

impl TrainOptions {
    pub fn new(csv: PathBuf, results_dir: PathBuf) -> Self {
        Self {
            csv,
            params: ForestParams::default(),
            test_fraction: 0.2,
            results_dir,
            model_file: "model.json".to_string(),
            metrics_file: "metrics.txt".to_string(),
            diagnostics_file: "diagnostics.json".to_string(),
            grid: None,
            aggregate_by_entity: false,
            sample: None,
            skip_diagnostics: false,
            interactive: false,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.results_dir.join(&self.model_file)
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct TrainSummary {
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    pub diagnostics_path: PathBuf,
    pub artifact: ModelArtifact,
    pub evaluation: EvaluationReport,
    pub diagnostics: Option<Diagnostics>,
    pub state: ModelState,
}

/// Run the whole pipeline.
pub fn run(
    opts: &TrainOptions,
    extractor: &FeatureExtractor,
    cancel: &AtomicBool,
) -> Result<TrainSummary> {
    let state = ModelState::Untrained.transition(ModelState::Training)?;

    match train_and_evaluate(opts, extractor, cancel) {
        Ok(trained) => {
            let state = state.transition(ModelState::Trained)?;
            persist(opts, extractor, trained, state)
        }
        Err(e) => {
            let _ = state.transition(ModelState::TrainingFailed);
            warn!(error = %e, "Training run failed");
            Err(e)
        }
    }
}

struct Trained {
    outcome: TrainOutcome,
    evaluation: EvaluationReport,
    diagnostics: Option<Diagnostics>,
    train_rows: usize,
    test_rows: usize,
}

fn checkpoint(cancel: &AtomicBool) -> Result<(), TrainingError> {
    if cancel.load(Ordering::SeqCst) {
        return Err(TrainingError::Cancelled);
    }
    Ok(())
}

fn train_and_evaluate(
    opts: &TrainOptions,
    extractor: &FeatureExtractor,
    cancel: &AtomicBool,
) -> Result<Trained> {
    // Step 1: Load raw rows
    if opts.interactive {
        println!("Loading dataset {}...", opts.csv.display());
    }
    let records = dataset::load_csv(&opts.csv, opts.sample)?;
    checkpoint(cancel)?;

    // Step 2: Extract features (and aggregate per account)
    let (prepared, stats) = dataset::prepare(extractor, &records, opts.aggregate_by_entity);
    drop(records);
    if prepared.is_empty() {
        return Err(TrainingError::EmptyDataset).context("No labeled rows in dataset");
    }
    let (humans, bots) = prepared.class_counts();
    info!(
        examples = stats.examples_out,
        humans,
        bots,
        "Dataset ready"
    );
    if opts.interactive {
        println!(
            "Prepared {} examples ({} human, {} bot) from {} rows",
            stats.examples_out, humans, bots, stats.rows_in
        );
    }
    checkpoint(cancel)?;

    // Step 3: Hold out a test set
    let split = dataset::train_test_split(&prepared, opts.test_fraction, opts.params.seed)?;
    checkpoint(cancel)?;

    // Step 4: Fit
    let mode = match &opts.grid {
        Some(g) => TrainMode::GridSearch {
            base: opts.params.clone(),
            grid: g.grid.clone(),
            folds: g.folds,
        },
        None => TrainMode::Direct(opts.params.clone()),
    };
    if opts.interactive {
        println!("Training on {} rows...", split.train.len());
    }
    let outcome = ModelTrainer::new()
        .with_progress(opts.interactive)
        .with_cancel(Cancel::on(cancel))
        .train(&split.train, &mode)?;
    checkpoint(cancel)?;

    // Step 5: Evaluate on the held-out set
    let evaluation = evaluation::evaluate(&outcome.model, &split.test)?;
    checkpoint(cancel)?;

    // Step 6: Optional diagnostics on the training partition
    let diagnostics = if opts.skip_diagnostics {
        None
    } else {
        Some(run_diagnostics(outcome.model.params(), &split.train, Cancel::on(cancel))?)
    };
    checkpoint(cancel)?;

    Ok(Trained {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        outcome,
        evaluation,
        diagnostics,
    })
}

fn run_diagnostics(
    params: &ForestParams,
    train: &LabeledDataset,
    cancel: Cancel<'_>,
) -> Result<Diagnostics> {
    match evaluation::diagnostics(params, train, cancel) {
        Err(TrainingError::Cancelled) => Err(TrainingError::Cancelled.into()),
        other => other.context("Diagnostics failed"),
    }
}

fn persist(
    opts: &TrainOptions,
    extractor: &FeatureExtractor,
    trained: Trained,
    state: ModelState,
) -> Result<TrainSummary> {
    let Trained {
        outcome,
        evaluation,
        diagnostics,
        train_rows,
        test_rows,
    } = trained;

    let params = outcome.model.params().clone();
    let metadata = TrainingMetadata {
        trained_at: Utc::now(),
        train_rows,
        test_rows,
        test_fraction: opts.test_fraction,
        aggregated_by_entity: opts.aggregate_by_entity,
        n_trees: params.n_trees,
        max_depth: params.max_depth,
        seed: params.seed,
        fit_seconds: outcome.cost.seconds(),
        grid_search: outcome.search.as_ref().map(GridSummary::from),
        test_accuracy: Some(evaluation.report.accuracy),
        sentiment: extractor.sentiment_name().to_string(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let artifact = ModelArtifact::new(extractor.schema(), metadata, outcome.model.clone());

    // Reports before the artifact, so a failed write keeps the previous model
    std::fs::create_dir_all(&opts.results_dir).with_context(|| {
        format!("Failed to create results directory {}", opts.results_dir.display())
    })?;
    let metrics_path = opts.results_dir.join(&opts.metrics_file);
    let diagnostics_path = opts.results_dir.join(&opts.diagnostics_file);
    let run = RunReport {
        evaluation: &evaluation,
        fit_seconds: outcome.cost.seconds(),
        search: outcome.search.as_ref(),
        diagnostics: diagnostics.as_ref(),
    };
    report::write_metrics(&metrics_path, &run)?;
    report::write_diagnostics(&diagnostics_path, &run)?;

    let model_path = opts.model_path();
    artifact::save(&artifact, &model_path)
        .with_context(|| format!("Failed to save model to {}", model_path.display()))?;
    let state = state.transition(ModelState::Persisted)?;

    if opts.interactive {
        if let Some(search) = &outcome.search {
            terminal::display_grid_search(search);
        }
        terminal::display_evaluation(&evaluation, outcome.cost.seconds());
        terminal::display_importances(&evaluation, 10);
        if let Some(diag) = &diagnostics {
            terminal::display_diagnostics(diag);
        }
    }

    Ok(TrainSummary {
        model_path,
        metrics_path,
        diagnostics_path,
        artifact,
        evaluation,
        diagnostics,
        state,
    })
}
