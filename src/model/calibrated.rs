//! Classifier with per-class isotonic calibration
//!
//! The calibrators are fitted on predictions of an already-trained classifier
//! over held-out rows only.

use serde::{Deserialize, Serialize};

use super::gbdt::GradientBoostedTrees;
use super::isotonic::IsotonicRegression;
use crate::{Outcome, OutcomeProbabilities, QuinielaError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedClassifier {
    classifier: GradientBoostedTrees,
    /// One calibrator per class, indexed by [`Outcome::index`]
    calibrators: Vec<IsotonicRegression>,
}

impl CalibratedClassifier {
    /// Calibrate a fitted classifier on holdout rows
    pub fn fit(
        classifier: GradientBoostedTrees,
        rows: &[Vec<f64>],
        outcomes: &[Outcome],
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(QuinielaError::Model(
                "calibration needs at least one holdout row".to_string(),
            ));
        }
        if rows.len() != outcomes.len() {
            return Err(QuinielaError::Model(format!(
                "{} holdout rows but {} outcomes",
                rows.len(),
                outcomes.len()
            )));
        }
        if classifier.num_classes() != Outcome::ALL.len() {
            return Err(QuinielaError::Model(format!(
                "expected a {}-class classifier, got {} classes",
                Outcome::ALL.len(),
                classifier.num_classes()
            )));
        }

        let raw: Vec<Vec<f64>> = rows.iter().map(|r| classifier.predict_proba(r)).collect();

        let calibrators = Outcome::ALL
            .iter()
            .map(|&class| {
                let scores: Vec<f64> = raw.iter().map(|p| p[class.index()]).collect();
                let targets: Vec<f64> = outcomes
                    .iter()
                    .map(|&o| if o == class { 1.0 } else { 0.0 })
                    .collect();
                IsotonicRegression::fit(&scores, &targets)
            })
            .collect();

        Ok(CalibratedClassifier {
            classifier,
            calibrators,
        })
    }

    /// Uncalibrated classifier probabilities
    pub fn predict_raw(&self, x: &[f64]) -> OutcomeProbabilities {
        OutcomeProbabilities::from_class_slice(&self.classifier.predict_proba(x))
    }

    /// Calibrated probabilities, renormalized to sum to 1 (uniform if all are zero)
    pub fn predict(&self, x: &[f64]) -> OutcomeProbabilities {
        let raw = self.classifier.predict_proba(x);
        let calibrated: Vec<f64> = self
            .calibrators
            .iter()
            .zip(&raw)
            .map(|(iso, &p)| iso.predict(p).max(0.0))
            .collect();

        let total: f64 = calibrated.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return OutcomeProbabilities::uniform();
        }
        let normalized: Vec<f64> = calibrated.iter().map(|p| p / total).collect();
        OutcomeProbabilities::from_class_slice(&normalized)
    }

    /// Check a deserialized model: a well-formed 3-class ensemble with one
    /// well-formed calibrator per class
    pub fn validate(&self) -> Result<()> {
        if self.classifier.num_classes() != Outcome::ALL.len()
            || self.calibrators.len() != Outcome::ALL.len()
        {
            return Err(QuinielaError::Model(format!(
                "expected {} classes, found {} in the classifier and {} calibrators",
                Outcome::ALL.len(),
                self.classifier.num_classes(),
                self.calibrators.len()
            )));
        }
        self.classifier.validate()?;
        for calibrator in &self.calibrators {
            calibrator.validate()?;
        }
        Ok(())
    }

    pub fn classifier(&self) -> &GradientBoostedTrees {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::gbdt::BoosterParams;

    fn data() -> (Vec<Vec<f64>>, Vec<Outcome>) {
        let mut rows = Vec::new();
        let mut outcomes = Vec::new();
        for i in 0..45 {
            let x = i as f64;
            rows.push(vec![x]);
            outcomes.push(match i % 15 {
                0..=4 => Outcome::Away,
                5..=9 => Outcome::Draw,
                _ => Outcome::Home,
            });
        }
        (rows, outcomes)
    }

    fn fitted() -> CalibratedClassifier {
        let (rows, outcomes) = data();
        let labels: Vec<usize> = outcomes.iter().map(|o| o.index()).collect();
        let params = BoosterParams {
            rounds: 10,
            ..BoosterParams::default()
        };
        let classifier = GradientBoostedTrees::fit(&rows, &labels, 3, params).unwrap();
        CalibratedClassifier::fit(classifier, &rows, &outcomes).unwrap()
    }

    #[test]
    fn test_calibrated_probabilities_are_distributions() {
        let model = fitted();
        for i in 0..60 {
            let probs = model.predict(&[i as f64 - 5.0]);
            assert!(probs.away >= 0.0 && probs.draw >= 0.0 && probs.home >= 0.0);
            assert!((probs.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejects_empty_holdout() {
        let (rows, outcomes) = data();
        let labels: Vec<usize> = outcomes.iter().map(|o| o.index()).collect();
        let classifier =
            GradientBoostedTrees::fit(&rows, &labels, 3, BoosterParams::default()).unwrap();
        assert!(CalibratedClassifier::fit(classifier, &[], &[]).is_err());
    }

    #[test]
    fn test_rejects_two_class_classifier() {
        let rows = vec![vec![0.0], vec![1.0]];
        let classifier =
            GradientBoostedTrees::fit(&rows, &[0, 1], 2, BoosterParams::default()).unwrap();
        let result = CalibratedClassifier::fit(classifier, &rows, &[Outcome::Away, Outcome::Draw]);
        assert!(matches!(result, Err(QuinielaError::Model(_))));
    }

    #[test]
    fn test_validate() {
        let model = fitted();
        assert!(model.validate().is_ok());

        let mut missing = model.clone();
        missing.calibrators.pop();
        assert!(matches!(missing.validate(), Err(QuinielaError::Model(_))));

        let mut refit = model;
        refit.calibrators[1] = IsotonicRegression::fit(&[0.2, 0.4], &[0.0, 1.0]);
        assert!(refit.validate().is_ok());
    }
}
