//! Value-pick selection
//!
//! A pick backs the home side when the estimated probability clears the
//! confidence threshold and beats the market by at least the minimum value.
//! Draw and away sides are not evaluated.

use super::source::ProbabilityEstimator;
use crate::features::FeatureVector;
use crate::{OutcomeProbabilities, Pick, PickConfig, Side};

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickSelector {
    pub threshold: f64,
    pub min_value: f64,
}

impl Default for PickSelector {
    fn default() -> Self {
        PickSelector {
            threshold: 0.70,
            min_value: 0.03,
        }
    }
}

impl PickSelector {
    pub fn new(threshold: f64, min_value: f64) -> Self {
        PickSelector {
            threshold,
            min_value,
        }
    }

    pub fn from_config(config: &PickConfig) -> Self {
        Self::new(config.threshold, config.min_value)
    }

    /// Apply the decision rule to one match
    pub fn evaluate(&self, features: &FeatureVector, probs: &OutcomeProbabilities) -> Option<Pick> {
        let implied_home = features.implied_home;
        let value_home = probs.home - implied_home;

        if probs.home >= self.threshold && value_home >= self.min_value {
            Some(Pick {
                match_id: features.match_id.clone(),
                date: features.date,
                home_team: features.home_team.clone(),
                away_team: features.away_team.clone(),
                side: Side::Home,
                probability: round3(probs.home),
                value: round3(value_home),
                implied_home,
            })
        } else {
            None
        }
    }

    /// Picks for every qualifying match, most probable first.
    ///
    /// Equal probabilities keep their feature order.
    pub fn select<E>(&self, features: &[FeatureVector], estimator: &E) -> Vec<Pick>
    where
        E: ProbabilityEstimator + ?Sized,
    {
        let mut picks: Vec<Pick> = features
            .iter()
            .filter_map(|f| self.evaluate(f, &estimator.estimate(f)))
            .collect();
        picks.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        picks
    }
}
