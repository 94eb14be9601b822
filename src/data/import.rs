//! CSV ingestion of the match table
//!
//! Required columns: `match_id,date,home_team,away_team,home_goals,away_goals`.
//! Odds and implied probability columns are optional.

use crate::features::odds::{implied_probability, parse_odd};
use crate::{MatchRecord, QuinielaError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One CSV row as written, before any parsing
#[derive(Debug, Deserialize)]
struct CsvRow {
    match_id: String,
    date: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    home_goals: String,
    #[serde(default)]
    away_goals: String,
    #[serde(default)]
    odds_home: String,
    #[serde(default)]
    odds_draw: String,
    #[serde(default)]
    odds_away: String,
    #[serde(default)]
    implied_home: String,
    #[serde(default)]
    implied_draw: String,
    #[serde(default)]
    implied_away: String,
}

/// Parsed rows plus counters for the import summary
#[derive(Debug, Default)]
pub struct ImportResult {
    pub records: Vec<MatchRecord>,
    pub skipped: usize,
}

impl ImportResult {
    pub fn resolved(&self) -> usize {
        self.records.iter().filter(|r| r.is_resolved()).count()
    }
}

/// Read a match CSV from disk
pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<ImportResult> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        QuinielaError::Parse(format!("cannot open {}: {}", path.display(), e))
    })?;
    read_csv(file)
}

/// Read match rows from any CSV source.
///
/// Rows with an empty id, an empty team or an unparseable date are skipped
/// with a warning. Malformed CSV structure is an error.
pub fn read_csv<R: Read>(source: R) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);

    let mut result = ImportResult::default();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let line = i + 2;
        match parse_row(row?) {
            Ok(record) => result.records.push(record),
            Err(reason) => {
                log::warn!("Line {}: {}, skipping", line, reason);
                result.skipped += 1;
            }
        }
    }

    log::debug!(
        "Parsed {} rows ({} skipped)",
        result.records.len(),
        result.skipped
    );
    Ok(result)
}

fn parse_row(row: CsvRow) -> std::result::Result<MatchRecord, String> {
    if row.match_id.is_empty() {
        return Err("missing match_id".to_string());
    }
    if row.home_team.is_empty() || row.away_team.is_empty() {
        return Err(format!("match {} is missing a team", row.match_id));
    }
    let date = parse_date(&row.date)
        .ok_or_else(|| format!("match {} has invalid date '{}'", row.match_id, row.date))?;

    let odds_home = parse_odd(&row.odds_home);
    let odds_draw = parse_odd(&row.odds_draw);
    let odds_away = parse_odd(&row.odds_away);

    Ok(MatchRecord {
        date,
        home_team: row.home_team,
        away_team: row.away_team,
        home_goals: parse_goals(&row.home_goals),
        away_goals: parse_goals(&row.away_goals),
        odds_home,
        odds_draw,
        odds_away,
        implied_home: parse_implied(&row.implied_home, odds_home),
        implied_draw: parse_implied(&row.implied_draw, odds_draw),
        implied_away: parse_implied(&row.implied_away, odds_away),
        match_id: row.match_id,
    })
}

/// `YYYY-MM-DD`, optionally followed by a time part after `' '` or `'T'`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10)?;
    let rest = &raw[10..];
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('T')) {
        return None;
    }
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Goal count; accepts `2` and `2.0`, anything else is unknown
pub fn parse_goals(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(goals) = raw.parse::<u32>() {
        return Some(goals);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Precomputed implied probability, else derived from the odd
fn parse_implied(raw: &str, odd: Option<f64>) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .or_else(|| odd.and_then(implied_probability))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "match_id,date,home_team,away_team,home_goals,away_goals,odds_home,odds_draw,odds_away";

    fn parse(body: &str) -> ImportResult {
        read_csv(format!("{}\n{}", HEADER, body).as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 8, 12);
        assert_eq!(parse_date("2023-08-12"), expected);
        assert_eq!(parse_date("2023-08-12 20:00:00"), expected);
        assert_eq!(parse_date("2023-08-12T18:30:00"), expected);
        assert_eq!(parse_date("12/08/2023"), None);
        assert_eq!(parse_date("2023-08"), None);
        assert_eq!(parse_date("2023-08-12garbage"), None);
        assert_eq!(parse_date("2023-08-123"), None);
    }

    #[test]
    fn test_parse_goals() {
        assert_eq!(parse_goals("3"), Some(3));
        assert_eq!(parse_goals("2.0"), Some(2));
        assert_eq!(parse_goals(""), None);
        assert_eq!(parse_goals("1.5"), None);
        assert_eq!(parse_goals("-1"), None);
        assert_eq!(parse_goals("nan"), None);
    }

    #[test]
    fn test_resolved_and_upcoming_rows() {
        let result = parse(
            "1,2024-01-06,Betis,Girona,2,1,2.10,3.30,3.60\n\
             2,2024-01-13,Girona,Betis,,,1.80,3.60,4.50",
        );
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.resolved(), 1);

        let first = &result.records[0];
        assert_eq!(first.score(), Some((2, 1)));
        assert_eq!(first.odds_home, Some(2.10));
        assert!((first.implied_home.unwrap() - 1.0 / 2.10).abs() < 1e-12);

        let second = &result.records[1];
        assert!(!second.is_resolved());
    }

    #[test]
    fn test_bad_odds_are_undefined() {
        let result = parse("1,2024-01-06,A,B,1,1,abc,0,\n");
        let record = &result.records[0];
        assert_eq!(record.odds_home, None);
        assert_eq!(record.implied_home, None);
        assert_eq!(record.odds_draw, Some(0.0));
        assert_eq!(record.implied_draw, None);
        assert_eq!(record.odds_away, None);
    }

    #[test]
    fn test_precomputed_implied_wins() {
        let csv = "match_id,date,home_team,away_team,home_goals,away_goals,odds_home,odds_draw,odds_away,implied_home,implied_draw,implied_away\n\
                   1,2024-01-06,A,B,0,0,2.0,3.0,4.0,0.6,,\n";
        let result = read_csv(csv.as_bytes()).unwrap();
        let record = &result.records[0];
        assert_eq!(record.implied_home, Some(0.6));
        assert!((record.implied_draw.unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(record.implied_away, Some(0.25));
    }

    #[test]
    fn test_minimal_columns() {
        let csv = "match_id,date,home_team,away_team,home_goals,away_goals\n\
                   7,2024-02-01,A,B,1,0\n";
        let result = read_csv(csv.as_bytes()).unwrap();
        let record = &result.records[0];
        assert_eq!(record.match_id, "7");
        assert_eq!(record.odds_home, None);
        assert_eq!(record.implied_home, None);
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let result = parse(
            "1,not-a-date,A,B,1,0,,,\n\
             2,2024-01-06,,B,1,0,,,\n\
             ,2024-01-06,A,B,1,0,,,\n\
             4,2024-01-06,A,B,1,0,,,",
        );
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped, 3);
        assert_eq!(result.records[0].match_id, "4");
    }

    #[test]
    fn test_read_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.csv");
        std::fs::write(&path, format!("{}\n1,2024-01-06,A,B,1,0,,,\n", HEADER)).unwrap();
        assert_eq!(read_csv_file(&path).unwrap().records.len(), 1);
        assert!(read_csv_file(dir.path().join("missing.csv")).is_err());
    }
}
