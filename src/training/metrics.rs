//! Classification metrics for the held-out evaluation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary confusion matrix with the standard four counts.
///
/// Class 0 is "no heart disease", class 1 is "heart disease".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against truth. Values are compared after rounding,
    /// so 0/1 floats and hard labels both work.
    pub fn from_predictions(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut m = Self {
            tn: 0,
            fp: 0,
            fn_: 0,
            tp: 0,
        };
        for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
            let truth = truth.round() as i64;
            let pred = pred.round() as i64;
            match (truth, pred) {
                (0, 0) => m.tn += 1,
                (0, _) => m.fp += 1,
                (_, 0) => m.fn_ += 1,
                _ => m.tp += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.tn + self.tp) as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        let denom = self.tp + self.fp;
        if denom == 0 {
            return 0.0;
        }
        self.tp as f64 / denom as f64
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tp + self.fn_;
        if denom == 0 {
            return 0.0;
        }
        self.tp as f64 / denom as f64
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    /// Per-class recall: (correct among actual-absent, correct among
    /// actual-present).
    pub fn class_rates(&self) -> (f64, f64) {
        let absent = self.tn + self.fp;
        let present = self.tp + self.fn_;
        let absent_rate = if absent == 0 {
            0.0
        } else {
            self.tn as f64 / absent as f64
        };
        let present_rate = if present == 0 {
            0.0
        } else {
            self.tp as f64 / present as f64
        };
        (absent_rate, present_rate)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "                    predicted")?;
        writeln!(f, "                    absent  present")?;
        writeln!(f, "  actual absent   {:>8} {:>8}", self.tn, self.fp)?;
        write!(f, "  actual present  {:>8} {:>8}", self.fn_, self.tp)
    }
}
