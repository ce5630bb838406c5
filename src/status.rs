// Model lifecycle state and the `inspect` status display.
//
// Untrained → Training → Trained → Persisted → Loaded → Serving, with two
// dead ends: TrainingFailed and SchemaMismatch. A freshly loaded artifact
// enters at Loaded (it was persisted by an earlier run).

use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelState {
    Untrained,
    Training,
    Trained,
    Persisted,
    Loaded,
    Serving,
    TrainingFailed,
    SchemaMismatch,
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal model state transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: ModelState,
    pub to: ModelState,
}

impl ModelState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ModelState::TrainingFailed | ModelState::SchemaMismatch)
    }

    pub fn can_transition(self, to: ModelState) -> bool {
        use ModelState::*;
        matches!(
            (self, to),
            (Untrained, Training)
                | (Training, Trained)
                | (Training, TrainingFailed)
                | (Trained, Persisted)
                | (Persisted, Loaded)
                | (Loaded, Serving)
                | (Loaded, SchemaMismatch)
        )
    }

    /// Move to `to`, logging the change, or refuse.
    pub fn transition(self, to: ModelState) -> Result<ModelState, IllegalTransition> {
        if !self.can_transition(to) {
            return Err(IllegalTransition { from: self, to });
        }
        info!(from = %self, to = %to, "Model state changed");
        Ok(to)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Display an artifact's schema and training metadata to the terminal.
pub fn show(model_path: &Path) -> Result<()> {
    if !model_path.exists() {
        println!("Model: not found at {}", model_path.display());
        println!("\nRun `botwatch train` to create one.");
        return Ok(());
    }

    let file_size = std::fs::metadata(model_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Model: {} ({})", model_path.display(), file_size);

    let artifact = match artifact::load(model_path) {
        Ok(a) => a,
        Err(e) if e.needs_retraining() => {
            println!("State: {}", ModelState::SchemaMismatch);
            println!("  Cannot be served: {e}");
            println!("  Retrain with `botwatch train`");
            return Ok(());
        }
        Err(e) => {
            println!("Artifact unreadable: {e}");
            return Ok(());
        }
    };

    let meta = &artifact.metadata;
    println!(
        "Schema: v{} ({} features, layout {:08x})",
        artifact.schema.version,
        artifact.schema.len(),
        artifact.schema.layout_hash()
    );
    println!(
        "Forest: {} trees, max depth {}",
        artifact.model.n_trees(),
        meta.max_depth
            .map_or_else(|| "unbounded".to_string(), |d| d.to_string())
    );
    println!(
        "Trained: {} (botwatch {})",
        meta.trained_at.format("%Y-%m-%d %H:%M:%S UTC"),
        meta.crate_version
    );
    println!(
        "Data: {} train / {} test rows{}",
        meta.train_rows,
        meta.test_rows,
        if meta.aggregated_by_entity {
            ", aggregated per account"
        } else {
            ""
        }
    );
    match meta.test_accuracy {
        Some(acc) => println!("Test accuracy: {:.4}", acc),
        None => println!("Test accuracy: not recorded"),
    }
    if let Some(grid) = &meta.grid_search {
        println!(
            "Grid search: best n_trees={} max_depth={:?} (cv {:.4}, {} candidates, {:.1}s)",
            grid.n_trees, grid.max_depth, grid.cv_score, grid.candidates, grid.search_seconds
        );
    }
    println!("Sentiment scorer: {}", meta.sentiment);
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
