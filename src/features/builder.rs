//! Per-match feature vectors from prior team form

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::odds::MarketProbabilities;
use super::team_form::FormTable;
use crate::{FeatureConfig, MatchRecord};

/// Engineered features for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub match_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    /// Rolling form differences (home minus away)
    pub pts_diff: f64,
    pub gf_diff: f64,
    pub ga_diff: f64,
    pub gd_diff: f64,
    pub implied_home: f64,
    pub implied_draw: f64,
    pub implied_away: f64,
    /// Raw goals, carried through for labeling
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

impl FeatureVector {
    pub const DIM: usize = 7;

    pub const NAMES: [&'static str; Self::DIM] = [
        "pts_diff",
        "gf_diff",
        "ga_diff",
        "gd_diff",
        "implied_home",
        "implied_draw",
        "implied_away",
    ];

    /// Numeric model inputs, in the order of [`FeatureVector::NAMES`]
    pub fn to_inputs(&self) -> [f64; Self::DIM] {
        [
            self.pts_diff,
            self.gf_diff,
            self.ga_diff,
            self.gd_diff,
            self.implied_home,
            self.implied_draw,
            self.implied_away,
        ]
    }
}

/// Builds feature vectors by replaying match history in date order
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    window: usize,
}

impl FeatureBuilder {
    pub fn new(config: &FeatureConfig) -> Self {
        Self::with_window(config.window)
    }

    pub fn with_window(window: usize) -> Self {
        FeatureBuilder { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Produce one feature vector per record, in ascending date order.
    ///
    /// Records sharing a date keep their input order. A match only sees
    /// results of matches processed before it; its own result is recorded
    /// after its features are emitted.
    pub fn build(&self, matches: &[MatchRecord]) -> Vec<FeatureVector> {
        let mut ordered: Vec<&MatchRecord> = matches.iter().collect();
        ordered.sort_by_key(|m| m.date);

        let mut form = FormTable::new(self.window);
        let mut features = Vec::with_capacity(ordered.len());

        for record in ordered {
            let home = form.stats(&record.home_team);
            let away = form.stats(&record.away_team);
            let market = MarketProbabilities::from_record(record);

            features.push(FeatureVector {
                match_id: record.match_id.clone(),
                date: record.date,
                home_team: record.home_team.clone(),
                away_team: record.away_team.clone(),
                pts_diff: home.pts_mean - away.pts_mean,
                gf_diff: home.gf_mean - away.gf_mean,
                ga_diff: home.ga_mean - away.ga_mean,
                gd_diff: home.gd_mean - away.gd_mean,
                implied_home: market.home,
                implied_draw: market.draw,
                implied_away: market.away,
                home_goals: record.home_goals,
                away_goals: record.away_goals,
            });

            if let Some((home_goals, away_goals)) = record.score() {
                form.record_result(&record.home_team, &record.away_team, home_goals, away_goals);
            }
        }

        log::debug!(
            "Built {} feature vectors for {} teams (window {})",
            features.len(),
            form.team_count(),
            self.window
        );

        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn played(id: &str, day: u32, home: &str, away: &str, hg: u32, ag: u32) -> MatchRecord {
        MatchRecord::new(id, date(day), home, away).with_score(hg, ag)
    }

    fn five_match_history() -> Vec<MatchRecord> {
        vec![
            played("m1", 1, "A", "B", 2, 0),
            played("m2", 2, "C", "D", 1, 1),
            played("m3", 3, "A", "C", 0, 1),
            played("m4", 4, "A", "B", 0, 5),
            played("m5", 5, "C", "A", 4, 4),
        ]
    }

    fn find<'a>(features: &'a [FeatureVector], id: &str) -> &'a FeatureVector {
        features.iter().find(|f| f.match_id == id).unwrap()
    }

    #[test]
    fn test_no_lookahead() {
        let features = FeatureBuilder::with_window(3).build(&five_match_history());
        let m3 = find(&features, "m3");

        // A: only m1 (2-0 win); C: only m2 (1-1 draw)
        assert_eq!(m3.pts_diff, 3.0 - 1.0);
        assert_eq!(m3.gf_diff, 2.0 - 1.0);
        assert_eq!(m3.ga_diff, 0.0 - 1.0);
        assert_eq!(m3.gd_diff, 2.0 - 0.0);

        // Later matches must not change the feature
        let truncated = FeatureBuilder::with_window(3).build(&five_match_history()[..3]);
        assert_eq!(find(&truncated, "m3"), m3);
    }

    #[test]
    fn test_first_match_has_zero_form() {
        let features = FeatureBuilder::with_window(3).build(&five_match_history());
        let m1 = find(&features, "m1");
        assert_eq!(m1.pts_diff, 0.0);
        assert_eq!(m1.gf_diff, 0.0);
        assert_eq!(m1.ga_diff, 0.0);
        assert_eq!(m1.gd_diff, 0.0);
    }

    #[test]
    fn test_input_order_is_irrelevant() {
        let mut shuffled = five_match_history();
        shuffled.reverse();
        let features = FeatureBuilder::with_window(3).build(&shuffled);
        let ids: Vec<_> = features.iter().map(|f| f.match_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5"]);
        assert_eq!(
            features,
            FeatureBuilder::with_window(3).build(&five_match_history())
        );
    }

    #[test]
    fn test_same_date_keeps_input_order() {
        let matches = vec![
            played("first", 1, "A", "B", 1, 0),
            played("second", 1, "A", "C", 2, 2),
        ];
        let features = FeatureBuilder::with_window(3).build(&matches);
        assert_eq!(features[0].match_id, "first");
        assert_eq!(features[1].match_id, "second");
        // The earlier row's result is visible to the later one
        assert_eq!(features[1].pts_diff, 3.0);
    }

    #[test]
    fn test_window_limits_history() {
        // A plays B five times before the target match; B never scores
        let mut matches: Vec<MatchRecord> = (1..=5)
            .map(|d| played(&format!("m{}", d), d, "A", "X", d, 0))
            .collect();
        matches.push(MatchRecord::new("target", date(10), "A", "Y"));

        let features = FeatureBuilder::with_window(3).build(&matches);
        let target = find(&features, "target");
        // Last three A results: 3-0, 4-0, 5-0
        assert_eq!(target.gf_diff, 4.0);
        assert_eq!(target.pts_diff, 3.0);
        assert_eq!(target.gd_diff, 4.0);
    }

    #[test]
    fn test_unresolved_matches_do_not_update_form() {
        let matches = vec![
            MatchRecord::new("future", date(1), "A", "B"),
            MatchRecord::new("later", date(2), "A", "B"),
        ];
        let features = FeatureBuilder::with_window(3).build(&matches);
        assert_eq!(features[1].pts_diff, 0.0);
        assert_eq!(features[1].home_goals, None);
    }

    #[test]
    fn test_implied_defaults_and_odds() {
        let matches = vec![
            MatchRecord::new("no-odds", date(1), "A", "B"),
            MatchRecord::new("odds", date(2), "A", "B").with_odds(2.0, 4.0, 5.0),
        ];
        let features = FeatureBuilder::with_window(3).build(&matches);
        assert_eq!(
            (features[0].implied_home, features[0].implied_draw, features[0].implied_away),
            (0.33, 0.33, 0.33)
        );
        assert_eq!(features[1].implied_home, 0.5);
        assert_eq!(features[1].implied_draw, 0.25);
        assert_eq!(features[1].implied_away, 0.2);
    }

    #[test]
    fn test_inputs_order() {
        let features = FeatureBuilder::with_window(3).build(&five_match_history());
        let m3 = find(&features, "m3");
        let inputs = m3.to_inputs();
        assert_eq!(inputs.len(), FeatureVector::NAMES.len());
        assert_eq!(inputs[0], m3.pts_diff);
        assert_eq!(inputs[4], m3.implied_home);
    }
}
