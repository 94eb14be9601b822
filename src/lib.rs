//! Football match prediction and value-pick selection
//!
//! Rolling team-form features, a calibrated gradient-boosted classifier and a
//! value-betting decision rule over bookmaker odds.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single match row from the match store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    /// Unknown for matches that have not been played yet
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    /// Decimal bookmaker odds
    pub odds_home: Option<f64>,
    pub odds_draw: Option<f64>,
    pub odds_away: Option<f64>,
    /// Precomputed market-implied probabilities
    pub implied_home: Option<f64>,
    pub implied_draw: Option<f64>,
    pub implied_away: Option<f64>,
}

impl MatchRecord {
    /// Create an unresolved match with no market data
    pub fn new(
        match_id: impl Into<String>,
        date: NaiveDate,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        MatchRecord {
            match_id: match_id.into(),
            date,
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_goals: None,
            away_goals: None,
            odds_home: None,
            odds_draw: None,
            odds_away: None,
            implied_home: None,
            implied_draw: None,
            implied_away: None,
        }
    }

    /// Set the final score
    pub fn with_score(mut self, home_goals: u32, away_goals: u32) -> Self {
        self.home_goals = Some(home_goals);
        self.away_goals = Some(away_goals);
        self
    }

    /// Set decimal odds for home/draw/away
    pub fn with_odds(mut self, home: f64, draw: f64, away: f64) -> Self {
        self.odds_home = Some(home);
        self.odds_draw = Some(draw);
        self.odds_away = Some(away);
        self
    }

    /// Set precomputed implied probabilities for home/draw/away
    pub fn with_implied(mut self, home: f64, draw: f64, away: f64) -> Self {
        self.implied_home = Some(home);
        self.implied_draw = Some(draw);
        self.implied_away = Some(away);
        self
    }

    /// Final score, if both goal counts are known
    pub fn score(&self) -> Option<(u32, u32)> {
        match (self.home_goals, self.away_goals) {
            (Some(h), Some(a)) => Some((h, a)),
            _ => None,
        }
    }

    /// Whether the match has a known final score
    pub fn is_resolved(&self) -> bool {
        self.score().is_some()
    }

    /// Outcome of the match, or None if unresolved
    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::from_goals(self.home_goals, self.away_goals)
    }
}

/// Three-way match outcome. Discriminants are the class indices used by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    Away = 0,
    Draw = 1,
    Home = 2,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Away, Outcome::Draw, Outcome::Home];

    /// Derive the outcome from goal counts; None if either is unknown
    pub fn from_goals(home_goals: Option<u32>, away_goals: Option<u32>) -> Option<Self> {
        let (home, away) = (home_goals?, away_goals?);
        Some(match home.cmp(&away) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Away,
        })
    }

    /// Class index (AWAY=0, DRAW=1, HOME=2)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Outcome::ALL.get(index).copied()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Away => write!(f, "AWAY"),
            Outcome::Draw => write!(f, "DRAW"),
            Outcome::Home => write!(f, "HOME"),
        }
    }
}

/// Probability distribution over the three outcomes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub away: f64,
    pub draw: f64,
    pub home: f64,
}

impl OutcomeProbabilities {
    pub fn new(away: f64, draw: f64, home: f64) -> Self {
        OutcomeProbabilities { away, draw, home }
    }

    pub fn uniform() -> Self {
        Self::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }

    /// Build from a class-indexed slice [away, draw, home]
    pub fn from_class_slice(probs: &[f64]) -> Self {
        let get = |i: usize| probs.get(i).copied().unwrap_or(0.0);
        Self::new(get(0), get(1), get(2))
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Away => self.away,
            Outcome::Draw => self.draw,
            Outcome::Home => self.home,
        }
    }

    pub fn sum(&self) -> f64 {
        self.away + self.draw + self.home
    }

    /// Most likely outcome (ties resolve towards the higher class index)
    pub fn most_likely(&self) -> Outcome {
        let mut best = Outcome::Away;
        for outcome in Outcome::ALL {
            if self.get(outcome) >= self.get(best) {
                best = outcome;
            }
        }
        best
    }
}

/// Side a pick backs. Only home picks are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Home,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "HOME"),
        }
    }
}

/// A value pick surfaced to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub match_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    #[serde(rename = "pick")]
    pub side: Side,
    /// Calibrated probability, rounded to 3 decimals
    #[serde(rename = "prob")]
    pub probability: f64,
    /// Probability minus implied probability, rounded to 3 decimals
    pub value: f64,
    pub implied_home: f64,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum QuinielaError {
    #[error("No match data available - run `quiniela data import` first")]
    NoMatches,

    #[error("No labeled matches to train on")]
    NoTrainingData,

    #[error("Cannot form stratified train/holdout split: {0}")]
    Split(String),

    #[error("Model artifact error: {0}")]
    Model(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, QuinielaError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub picks: PickConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: PathBuf,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Number of most recent matches in the rolling form window
    pub window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickConfig {
    /// Minimum calibrated home probability
    pub threshold: f64,
    /// Minimum margin of probability over implied probability
    pub min_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub lambda: f64,
    pub min_child_weight: f64,
    /// Fraction of labeled examples held out for calibration
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: PathBuf::from("data/matches.db"),
                model_path: PathBuf::from("model/model.json"),
            },
            features: FeatureConfig { window: 3 },
            picks: PickConfig {
                threshold: 0.70,
                min_value: 0.03,
            },
            training: TrainingConfig {
                rounds: 50,
                learning_rate: 0.1,
                max_depth: 6,
                lambda: 1.0,
                min_child_weight: 1.0,
                test_fraction: 0.2,
                seed: 42,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            QuinielaError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| QuinielaError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuinielaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(QuinielaError::Config(
                "features.window must be at least 1".to_string(),
            ));
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            return Err(QuinielaError::Config(format!(
                "training.test_fraction must be in (0, 1), got {}",
                self.training.test_fraction
            )));
        }
        if self.training.rounds == 0 {
            return Err(QuinielaError::Config(
                "training.rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_outcome_from_goals() {
        assert_eq!(Outcome::from_goals(Some(2), Some(1)), Some(Outcome::Home));
        assert_eq!(Outcome::from_goals(Some(1), Some(1)), Some(Outcome::Draw));
        assert_eq!(Outcome::from_goals(Some(0), Some(3)), Some(Outcome::Away));
        assert_eq!(Outcome::from_goals(None, Some(2)), None);
        assert_eq!(Outcome::from_goals(Some(2), None), None);
    }

    #[test]
    fn test_outcome_class_indices() {
        assert_eq!(Outcome::Away.index(), 0);
        assert_eq!(Outcome::Draw.index(), 1);
        assert_eq!(Outcome::Home.index(), 2);
        assert_eq!(Outcome::from_index(2), Some(Outcome::Home));
        assert_eq!(Outcome::from_index(3), None);
    }

    #[test]
    fn test_match_record_score() {
        let upcoming = MatchRecord::new("m1", date(1), "A", "B");
        assert!(!upcoming.is_resolved());
        assert_eq!(upcoming.outcome(), None);

        let played = upcoming.with_score(3, 1);
        assert_eq!(played.score(), Some((3, 1)));
        assert_eq!(played.outcome(), Some(Outcome::Home));
    }

    #[test]
    fn test_pick_serializes_with_public_field_names() {
        let pick = Pick {
            match_id: "m1".to_string(),
            date: date(5),
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            side: Side::Home,
            probability: 0.812,
            value: 0.05,
            implied_home: 0.76,
        };
        let json = serde_json::to_value(&pick).unwrap();
        assert_eq!(json["pick"], "HOME");
        assert_eq!(json["prob"], 0.812);
        assert_eq!(json["value"], 0.05);
        assert_eq!(json["date"], "2024-01-05");
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.features.window, 3);
        assert_eq!(parsed.picks.threshold, 0.70);
        assert_eq!(parsed.picks.min_value, 0.03);
    }

    #[test]
    fn test_config_rejects_zero_window() {
        let mut config = Config::default();
        config.features.window = 0;
        assert!(matches!(config.validate(), Err(QuinielaError::Config(_))));
    }

    #[test]
    fn test_most_likely_outcome() {
        let probs = OutcomeProbabilities::new(0.2, 0.3, 0.5);
        assert_eq!(probs.most_likely(), Outcome::Home);
        let probs = OutcomeProbabilities::new(0.6, 0.3, 0.1);
        assert_eq!(probs.most_likely(), Outcome::Away);
    }
}
