// Training run reports: metrics.txt (human-readable) and diagnostics.json
// (chart data for any plotting tool).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::evaluation::{ConfusionMatrix, Diagnostics, EvaluationReport, FeatureImportance};
use crate::training::GridSearchResult;

/// Everything a run reports about itself.
pub struct RunReport<'a> {
    pub evaluation: &'a EvaluationReport,
    pub fit_seconds: f64,
    pub search: Option<&'a GridSearchResult>,
    pub diagnostics: Option<&'a Diagnostics>,
}

pub fn render_metrics(run: &RunReport<'_>) -> String {
    let mut out = String::new();
    out.push_str("Classification Report:\n");
    out.push_str(&run.evaluation.report.to_string());
    out.push_str("\n\nConfusion Matrix:\n");
    out.push_str(&run.evaluation.confusion.to_string());
    out.push_str(&format!("\n\nTraining Time: {:.2} seconds\n", run.fit_seconds));

    if let Some(search) = run.search {
        let best = search.best();
        out.push_str(&format!(
            "\nBest Parameters: n_trees={} max_depth={}\n",
            best.n_trees,
            best.max_depth
                .map_or_else(|| "None".to_string(), |d| d.to_string())
        ));
        out.push_str(&format!(
            "Best CV Accuracy: {:.4} ({} folds)\n",
            search.best_score, search.folds
        ));
    }
    if let Some(diag) = run.diagnostics {
        out.push_str(&format!(
            "\nCross-Validation Accuracy: {:.4} +/- {:.4}\n",
            diag.cv_mean, diag.cv_std
        ));
    }
    out
}

#[derive(Serialize)]
struct DiagnosticsFile<'a> {
    confusion_matrix: &'a ConfusionMatrix,
    feature_importances: Vec<&'a FeatureImportance>,
    grid_search: Option<&'a GridSearchResult>,
    #[serde(flatten)]
    diagnostics: Option<&'a Diagnostics>,
}

pub fn write_metrics(path: &Path, run: &RunReport<'_>) -> Result<()> {
    fs::write(path, render_metrics(run))
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    info!(path = %path.display(), "Wrote metrics report");
    Ok(())
}

pub fn write_diagnostics(path: &Path, run: &RunReport<'_>) -> Result<()> {
    let file = DiagnosticsFile {
        confusion_matrix: &run.evaluation.confusion,
        feature_importances: run.evaluation.ranked_importances(),
        grid_search: run.search,
        diagnostics: run.diagnostics,
    };
    let json = serde_json::to_string_pretty(&file).context("Failed to serialize diagnostics")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write diagnostics to {}", path.display()))?;
    info!(path = %path.display(), "Wrote diagnostics");
    Ok(())
}
