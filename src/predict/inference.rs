//! Batch inference over the match table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::picks::{round3, PickSelector};
use super::source::{ProbabilityEstimator, ProbabilitySource};
use crate::features::FeatureBuilder;
use crate::{Config, MatchRecord, Outcome, OutcomeProbabilities, Pick};

/// Probabilities for a single match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub match_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub p_home: f64,
    pub p_draw: f64,
    pub p_away: f64,
    pub implied_home: f64,
    /// Final result, if the match has been played
    pub result: Option<Outcome>,
}

/// Predictor for a single batch: the probability source is fixed at creation
pub struct Predictor {
    source: ProbabilitySource,
    builder: FeatureBuilder,
    selector: PickSelector,
}

impl Predictor {
    pub fn new(config: &Config, source: ProbabilitySource) -> Self {
        let builder = FeatureBuilder::new(&config.features);
        if let Some(artifact) = source.artifact() {
            if artifact.window != builder.window() {
                log::warn!(
                    "Model was trained with a form window of {}, features use {}",
                    artifact.window,
                    builder.window()
                );
            }
        }

        Predictor {
            source,
            builder,
            selector: PickSelector::from_config(&config.picks),
        }
    }

    /// Create a predictor, loading the configured model artifact once
    pub fn load(config: &Config) -> Self {
        let source = ProbabilitySource::load(&config.data.model_path);
        Self::new(config, source)
    }

    pub fn source(&self) -> &ProbabilitySource {
        &self.source
    }

    /// Probabilities for every match, resolved or upcoming, in date order
    pub fn predict(&self, matches: &[MatchRecord]) -> Vec<MatchPrediction> {
        self.builder
            .build(matches)
            .into_iter()
            .map(|f| {
                let probs: OutcomeProbabilities = self.source.estimate(&f);
                MatchPrediction {
                    result: Outcome::from_goals(f.home_goals, f.away_goals),
                    p_home: round3(probs.home),
                    p_draw: round3(probs.draw),
                    p_away: round3(probs.away),
                    implied_home: f.implied_home,
                    match_id: f.match_id,
                    date: f.date,
                    home_team: f.home_team,
                    away_team: f.away_team,
                }
            })
            .collect()
    }

    /// Ranked value picks. `threshold` and `min_value` override the configured rule.
    pub fn picks(
        &self,
        matches: &[MatchRecord],
        threshold: Option<f64>,
        min_value: Option<f64>,
    ) -> Vec<Pick> {
        if matches.is_empty() {
            return Vec::new();
        }

        let selector = PickSelector::new(
            threshold.unwrap_or(self.selector.threshold),
            min_value.unwrap_or(self.selector.min_value),
        );
        let features = self.builder.build(matches);
        let picks = selector.select(&features, &self.source);

        log::info!(
            "{} picks from {} matches using {} (threshold {:.2}, min value {:.2})",
            picks.len(),
            features.len(),
            self.source.name(),
            selector.threshold,
            selector.min_value
        );
        picks
    }
}
