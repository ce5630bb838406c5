// Per-class precision/recall/F1 and the text classification report.

use serde::Serialize;

use super::confusion::{ratio, ConfusionMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn new(true_pos: usize, false_pos: usize, false_neg: usize) -> Self {
        let precision = ratio(true_pos, true_pos + false_pos);
        let recall = ratio(true_pos, true_pos + false_neg);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1,
            support: true_pos + false_neg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub human: ClassMetrics,
    pub bot: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(m: &ConfusionMatrix) -> Self {
        let human = ClassMetrics::new(m.true_negative, m.false_negative, m.false_positive);
        let bot = ClassMetrics::new(m.true_positive, m.false_positive, m.false_negative);
        let total = m.total();

        Self {
            human,
            bot,
            accuracy: m.accuracy(),
            macro_avg: blend(&human, &bot, 1.0, 1.0, total),
            weighted_avg: blend(
                &human,
                &bot,
                human.support as f64,
                bot.support as f64,
                total,
            ),
        }
    }
}

/// Weighted mean of two classes' metrics.
fn blend(human: &ClassMetrics, bot: &ClassMetrics, wh: f64, wb: f64, total: usize) -> ClassMetrics {
    let mix = |a: f64, b: f64| {
        if wh + wb == 0.0 {
            0.0
        } else {
            (a * wh + b * wb) / (wh + wb)
        }
    };
    ClassMetrics {
        precision: mix(human.precision, bot.precision),
        recall: mix(human.recall, bot.recall),
        f1: mix(human.f1, bot.f1),
        support: total,
    }
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        metrics_row(f, "human", &self.human)?;
        metrics_row(f, "bot", &self.bot)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        metrics_row(f, "macro avg", &self.macro_avg)?;
        metrics_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn metrics_row(f: &mut std::fmt::Formatter<'_>, name: &str, c: &ClassMetrics) -> std::fmt::Result {
    writeln!(
        f,
        "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, c.precision, c.recall, c.f1, c.support
    )
}
