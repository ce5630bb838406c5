// Binary confusion matrix. Rows are the true class, columns the prediction,
// human (negative) first.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[bool], predicted: &[bool]) -> Self {
        let mut m = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_positive += 1,
                (true, false) => m.false_negative += 1,
                (true, true) => m.true_positive += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negative + self.true_positive, self.total())
    }

    /// `[[tn, fp], [fn, tp]]`
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

impl Serialize for ConfusionMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_rows().serialize(serializer)
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>14}{:>10}{:>10}", "", "pred human", "pred bot")?;
        writeln!(
            f,
            "{:>14}{:>10}{:>10}",
            "true human", self.true_negative, self.false_positive
        )?;
        write!(
            f,
            "{:>14}{:>10}{:>10}",
            "true bot", self.false_negative, self.true_positive
        )
    }
}

/// `num / den`, 0 when `den` is 0.
pub(crate) fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
