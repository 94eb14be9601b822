//! Holdout evaluation metrics

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Outcome, OutcomeProbabilities};

/// Probabilistic accuracy of a set of predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub samples: usize,
    /// Share of predictions whose most likely outcome happened
    pub accuracy: f64,
    /// Mean negative log probability of the observed outcome
    pub log_loss: f64,
    /// Mean multiclass Brier score (sum of squared errors over the three outcomes)
    pub brier: f64,
}

impl Metrics {
    /// Evaluate predictions against observed outcomes.
    ///
    /// Mismatched or empty inputs yield zeroed metrics.
    pub fn evaluate(predictions: &[OutcomeProbabilities], outcomes: &[Outcome]) -> Self {
        if predictions.is_empty() || predictions.len() != outcomes.len() {
            return Metrics::default();
        }

        let mut correct = 0usize;
        let mut log_loss_sum = 0.0;
        let mut brier_sum = 0.0;

        for (p, &outcome) in predictions.iter().zip(outcomes) {
            if p.most_likely() == outcome {
                correct += 1;
            }
            log_loss_sum -= p.get(outcome).clamp(1e-15, 1.0).ln();
            for candidate in Outcome::ALL {
                let y = if candidate == outcome { 1.0 } else { 0.0 };
                brier_sum += (p.get(candidate) - y).powi(2);
            }
        }

        let n = predictions.len() as f64;
        Metrics {
            samples: predictions.len(),
            accuracy: correct as f64 / n,
            log_loss: log_loss_sum / n,
            brier: brier_sum / n,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} | Acc: {:.2}% | LogLoss: {:.4} | Brier: {:.4}",
            self.samples,
            self.accuracy * 100.0,
            self.log_loss,
            self.brier
        )
    }
}

/// Summary of a training run, stored with the model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Matches with a known result
    pub labeled: usize,
    pub train_size: usize,
    pub holdout_size: usize,
    /// Labeled examples per class, [away, draw, home]
    pub class_counts: [usize; 3],
    /// Holdout metrics of the uncalibrated classifier
    pub raw: Metrics,
    /// Holdout metrics after calibration (in-sample for the calibrator)
    pub calibrated: Metrics,
}
