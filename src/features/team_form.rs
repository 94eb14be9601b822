//! Team form computation
//!
//! Rolling statistics for teams based on their most recent results.

use std::collections::{HashMap, VecDeque};

/// League points for a result from the team's perspective
pub fn points_for(goals_for: u32, goals_against: u32) -> u8 {
    match goals_for.cmp(&goals_against) {
        std::cmp::Ordering::Greater => 3,
        std::cmp::Ordering::Equal => 1,
        std::cmp::Ordering::Less => 0,
    }
}

/// One played match from a team's perspective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormEntry {
    pub points: u8,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl FormEntry {
    pub fn new(goals_for: u32, goals_against: u32) -> Self {
        FormEntry {
            points: points_for(goals_for, goals_against),
            goals_for,
            goals_against,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }
}

/// Rolling means over a team's recent form window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormStats {
    pub pts_mean: f64,
    pub gf_mean: f64,
    pub ga_mean: f64,
    pub gd_mean: f64,
    /// Number of entries the means were taken over (0 for an unseen team)
    pub matches: usize,
}

/// Recent results for a single team, capped at the window size
#[derive(Debug, Clone)]
pub struct TeamForm {
    window: usize,
    entries: VecDeque<FormEntry>,
}

impl TeamForm {
    pub fn new(window: usize) -> Self {
        TeamForm {
            window,
            entries: VecDeque::with_capacity(window),
        }
    }

    /// Append a result, evicting the oldest one once the window is full
    pub fn push(&mut self, entry: FormEntry) {
        if self.window == 0 {
            return;
        }
        if self.entries.len() == self.window {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Means over the retained entries
    pub fn stats(&self) -> FormStats {
        let matches = self.entries.len();
        if matches == 0 {
            return FormStats::default();
        }

        let n = matches as f64;
        let (mut pts, mut gf, mut ga, mut gd) = (0.0, 0.0, 0.0, 0.0);
        for entry in &self.entries {
            pts += entry.points as f64;
            gf += entry.goals_for as f64;
            ga += entry.goals_against as f64;
            gd += entry.goal_difference() as f64;
        }

        FormStats {
            pts_mean: pts / n,
            gf_mean: gf / n,
            ga_mean: ga / n,
            gd_mean: gd / n,
            matches,
        }
    }
}

/// Form of every team seen so far in a single feature-building run
pub struct FormTable {
    window: usize,
    teams: HashMap<String, TeamForm>,
}

impl FormTable {
    pub fn new(window: usize) -> Self {
        FormTable {
            window,
            teams: HashMap::new(),
        }
    }

    /// Rolling stats for a team; zeros with a count of 0 if it has no results
    pub fn stats(&self, team: &str) -> FormStats {
        self.teams
            .get(team)
            .map(TeamForm::stats)
            .unwrap_or_default()
    }

    /// Record a played match for both sides
    pub fn record_result(&mut self, home: &str, away: &str, home_goals: u32, away_goals: u32) {
        let window = self.window;
        self.teams
            .entry(home.to_string())
            .or_insert_with(|| TeamForm::new(window))
            .push(FormEntry::new(home_goals, away_goals));
        self.teams
            .entry(away.to_string())
            .or_insert_with(|| TeamForm::new(window))
            .push(FormEntry::new(away_goals, home_goals));
    }

    /// Number of teams with at least one recorded result
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }
}
