// Colored terminal output for training runs, predictions and the schema.
//
// main.rs and the training pipeline delegate all terminal formatting here.

use colored::Colorize;

use crate::evaluation::{Diagnostics, EvaluationReport};
use crate::features::FeatureSchema;
use crate::service::PredictionResult;
use crate::training::GridSearchResult;

/// Display the held-out evaluation of a freshly trained model.
pub fn display_evaluation(report: &EvaluationReport, fit_seconds: f64) {
    println!("\n{}", "=== Evaluation (held-out set) ===".bold());
    println!();
    println!("{}", report.report);
    println!();
    println!("{}", report.confusion);
    println!();
    println!(
        "  Accuracy: {}   Training time: {:.2}s",
        colorize_score(report.report.accuracy),
        fit_seconds
    );
}

/// Top feature importances as a bar list.
pub fn display_importances(report: &EvaluationReport, top: usize) {
    println!("\n{}", "=== Feature importances ===".bold());
    for fi in report.ranked_importances().into_iter().take(top) {
        let bar = "#".repeat((fi.importance * 50.0).round() as usize);
        println!(
            "  {:<26} {:>6.4}  {}",
            fi.name,
            fi.importance,
            bar.dimmed()
        );
    }
}

pub fn display_grid_search(search: &GridSearchResult) {
    println!(
        "\n{}",
        format!(
            "=== Grid search ({} candidates x {} folds) ===",
            search.candidates.len(),
            search.folds
        )
        .bold()
    );
    println!(
        "  {:>8}  {:>9}  {:>8}  {:>7}",
        "Trees".dimmed(),
        "Max depth".dimmed(),
        "CV mean".dimmed(),
        "Std".dimmed(),
    );
    for (i, c) in search.candidates.iter().enumerate() {
        let depth = c
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        let line = format!(
            "  {:>8}  {:>9}  {:>8.4}  {:>7.4}",
            c.n_trees, depth, c.mean_score, c.std_score
        );
        if i == search.best_index {
            println!("{}  {}", line.green(), "<- best".green());
        } else {
            println!("{line}");
        }
    }
    println!("  Search time: {:.1}s", search.search_seconds);
}

pub fn display_diagnostics(diag: &Diagnostics) {
    println!("\n{}", "=== Diagnostics (training set) ===".bold());
    println!(
        "  {}-fold CV accuracy: {:.4} +/- {:.4}",
        diag.cv_scores.len(),
        diag.cv_mean,
        diag.cv_std
    );
    println!("  Learning curve (rows: train / validation):");
    for p in &diag.learning_curve {
        println!(
            "    {:>7}: {:.4} / {:.4}",
            p.x, p.train_score, p.validation_score
        );
    }
    println!("  Validation curve (trees: train / validation):");
    for p in &diag.validation_curve {
        println!(
            "    {:>7}: {:.4} / {:.4}",
            p.x, p.train_score, p.validation_score
        );
    }
}

pub fn display_prediction(result: &PredictionResult) {
    let verdict = if result.is_bot {
        "BOT".red().bold()
    } else {
        "HUMAN".green().bold()
    };
    println!(
        "{}  probability {:.3}  (schema v{})",
        verdict, result.probability, result.schema_version
    );
}

pub fn display_schema(schema: &FeatureSchema) {
    println!(
        "{}",
        format!(
            "Feature schema v{} ({} features, layout {:08x})",
            schema.version,
            schema.len(),
            schema.layout_hash()
        )
        .bold()
    );
    for (i, name) in schema.names.iter().enumerate() {
        println!("  {:>2}. {}", i, name);
    }
}

fn colorize_score(score: f64) -> String {
    let text = format!("{:.4}", score);
    if score >= 0.9 {
        text.green().to_string()
    } else if score >= 0.7 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}
