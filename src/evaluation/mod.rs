// Evaluation: how well a fitted forest does on held-out data.

pub mod confusion;
pub mod curves;
pub mod metrics;

pub use confusion::ConfusionMatrix;
pub use curves::{diagnostics, CurvePoint, Diagnostics};
pub use metrics::{ClassMetrics, ClassificationReport};

use serde::Serialize;
use tracing::info;

use crate::dataset::LabeledDataset;
use crate::error::TrainingError;
use crate::model::RandomForest;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
    /// In schema order.
    pub importances: Vec<FeatureImportance>,
}

impl EvaluationReport {
    /// Importances, largest first.
    pub fn ranked_importances(&self) -> Vec<&FeatureImportance> {
        let mut ranked: Vec<&FeatureImportance> = self.importances.iter().collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked
    }
}

/// Score `model` on `test`. The test set must share the model's schema.
pub fn evaluate(
    model: &RandomForest,
    test: &LabeledDataset,
) -> Result<EvaluationReport, TrainingError> {
    if test.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    let predicted = model.predict_many(&test.rows());
    let confusion = ConfusionMatrix::from_predictions(&test.labels(), &predicted);
    let report = ClassificationReport::from_confusion(&confusion);

    let importances = test
        .schema
        .names
        .iter()
        .zip(model.feature_importances())
        .map(|(name, &importance)| FeatureImportance {
            name: name.clone(),
            importance,
        })
        .collect();

    info!(
        accuracy = report.accuracy,
        bot_f1 = report.bot.f1,
        rows = test.len(),
        "Evaluated model"
    );
    Ok(EvaluationReport {
        report,
        confusion,
        importances,
    })
}
