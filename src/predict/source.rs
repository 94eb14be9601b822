//! Probability sources for inference

use std::path::Path;

use crate::features::FeatureVector;
use crate::model::ModelArtifact;
use crate::OutcomeProbabilities;

/// Anything that turns match features into outcome probabilities
pub trait ProbabilityEstimator {
    fn estimate(&self, features: &FeatureVector) -> OutcomeProbabilities;
}

/// Where a prediction batch gets its probabilities from.
///
/// Chosen once per batch; a loaded artifact is never modified.
#[derive(Debug, Clone)]
pub enum ProbabilitySource {
    CalibratedModel(ModelArtifact),
    NaiveOddsBaseline,
}

impl ProbabilitySource {
    /// Load the artifact at `path`, falling back to the odds baseline if it
    /// is missing or cannot be read
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!(
                "No model at {}; using implied probabilities from odds",
                path.display()
            );
            return ProbabilitySource::NaiveOddsBaseline;
        }

        match ModelArtifact::load(path) {
            Ok(artifact) => {
                log::info!(
                    "Loaded model from {} (trained {})",
                    path.display(),
                    artifact.created_at.format("%Y-%m-%d %H:%M")
                );
                ProbabilitySource::CalibratedModel(artifact)
            }
            Err(e) => {
                log::warn!(
                    "Failed to load model {}: {}; using implied probabilities from odds",
                    path.display(),
                    e
                );
                ProbabilitySource::NaiveOddsBaseline
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProbabilitySource::CalibratedModel(_) => "calibrated model",
            ProbabilitySource::NaiveOddsBaseline => "odds baseline",
        }
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        match self {
            ProbabilitySource::CalibratedModel(artifact) => Some(artifact),
            ProbabilitySource::NaiveOddsBaseline => None,
        }
    }
}

impl ProbabilityEstimator for ProbabilitySource {
    fn estimate(&self, features: &FeatureVector) -> OutcomeProbabilities {
        match self {
            ProbabilitySource::CalibratedModel(artifact) => artifact.predict(features),
            ProbabilitySource::NaiveOddsBaseline => naive_odds(features),
        }
    }
}

/// Implied probabilities normalized to sum to 1.
///
/// Negative inputs count as zero; a non-positive total is returned as is.
pub fn naive_odds(features: &FeatureVector) -> OutcomeProbabilities {
    let home = features.implied_home.max(0.0);
    let draw = features.implied_draw.max(0.0);
    let away = features.implied_away.max(0.0);
    let total = home + draw + away;
    let total = if total > 0.0 { total } else { 1.0 };
    OutcomeProbabilities::new(away / total, draw / total, home / total)
}
