//! Market-implied probabilities from bookmaker odds

use crate::MatchRecord;
use serde::{Deserialize, Serialize};

/// Implied probability used when a match carries no market data
pub const DEFAULT_IMPLIED: f64 = 0.33;

/// Reciprocal of a decimal odd; None for non-positive or non-finite odds
pub fn implied_probability(odd: f64) -> Option<f64> {
    if odd.is_finite() && odd > 0.0 {
        Some(1.0 / odd)
    } else {
        None
    }
}

/// Parse a raw decimal odd; blank or unparseable input is None
pub fn parse_odd(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Implied probabilities for a match after defaults are applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Default for MarketProbabilities {
    fn default() -> Self {
        MarketProbabilities {
            home: DEFAULT_IMPLIED,
            draw: DEFAULT_IMPLIED,
            away: DEFAULT_IMPLIED,
        }
    }
}

impl MarketProbabilities {
    /// Resolve a record's implied probabilities.
    ///
    /// Precomputed values take precedence, then the reciprocal of the matching
    /// odd, then [`DEFAULT_IMPLIED`].
    pub fn from_record(record: &MatchRecord) -> Self {
        let resolve = |implied: Option<f64>, odd: Option<f64>| {
            implied
                .filter(|p| p.is_finite())
                .or_else(|| odd.and_then(implied_probability))
                .unwrap_or(DEFAULT_IMPLIED)
        };
        MarketProbabilities {
            home: resolve(record.implied_home, record.odds_home),
            draw: resolve(record.implied_draw, record.odds_draw),
            away: resolve(record.implied_away, record.odds_away),
        }
    }
}
