//! SQLite storage for the match table

use crate::{MatchRecord, QuinielaError, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

const MATCH_COLUMNS: &str = "match_id, date, home_team, away_team, home_goals, away_goals,
     odds_home, odds_draw, odds_away, implied_home, implied_draw, implied_away";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                match_id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_goals INTEGER,
                away_goals INTEGER,
                odds_home REAL,
                odds_draw REAL,
                odds_away REAL,
                implied_home REAL,
                implied_draw REAL,
                implied_away REAL
            );

            CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Match Operations ====================

    /// Insert or update a match record by its identifier
    pub fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        upsert(&self.conn, record)
    }

    /// Insert or update multiple match records in a single transaction
    pub fn upsert_matches(&self, records: &[MatchRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        for record in records {
            upsert(&tx, record)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    /// Get all matches in insertion order
    pub fn get_all_matches(&self) -> Result<Vec<MatchRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM matches ORDER BY rowid", MATCH_COLUMNS))?;
        let rows = stmt
            .query_map([], Self::row_to_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawMatchRow::into_record).collect()
    }

    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawMatchRow> {
        Ok(RawMatchRow {
            match_id: row.get(0)?,
            date: row.get(1)?,
            home_team: row.get(2)?,
            away_team: row.get(3)?,
            home_goals: row.get(4)?,
            away_goals: row.get(5)?,
            odds_home: row.get(6)?,
            odds_draw: row.get(7)?,
            odds_away: row.get(8)?,
            implied_home: row.get(9)?,
            implied_draw: row.get(10)?,
            implied_away: row.get(11)?,
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let match_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;

        let resolved_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM matches WHERE home_goals IS NOT NULL AND away_goals IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let team_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT home_team FROM matches UNION SELECT away_team FROM matches)",
            [],
            |row| row.get(0),
        )?;

        let (min_date, max_date): (Option<String>, Option<String>) =
            self.conn
                .query_row("SELECT MIN(date), MAX(date) FROM matches", [], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;

        Ok(DatabaseStats {
            match_count: match_count as usize,
            resolved_count: resolved_count as usize,
            team_count: team_count as usize,
            earliest_match: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_match: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

fn upsert(conn: &Connection, record: &MatchRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO matches (match_id, date, home_team, away_team, home_goals, away_goals,
                             odds_home, odds_draw, odds_away,
                             implied_home, implied_draw, implied_away)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(match_id) DO UPDATE SET
            date = excluded.date,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            odds_home = excluded.odds_home,
            odds_draw = excluded.odds_draw,
            odds_away = excluded.odds_away,
            implied_home = excluded.implied_home,
            implied_draw = excluded.implied_draw,
            implied_away = excluded.implied_away
        "#,
        params![
            record.match_id,
            record.date.format("%Y-%m-%d").to_string(),
            record.home_team,
            record.away_team,
            record.home_goals,
            record.away_goals,
            record.odds_home,
            record.odds_draw,
            record.odds_away,
            record.implied_home,
            record.implied_draw,
            record.implied_away,
        ],
    )?;
    Ok(())
}

/// Column values as stored, before date parsing
struct RawMatchRow {
    match_id: String,
    date: String,
    home_team: String,
    away_team: String,
    home_goals: Option<u32>,
    away_goals: Option<u32>,
    odds_home: Option<f64>,
    odds_draw: Option<f64>,
    odds_away: Option<f64>,
    implied_home: Option<f64>,
    implied_draw: Option<f64>,
    implied_away: Option<f64>,
}

impl RawMatchRow {
    fn into_record(self) -> Result<MatchRecord> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|e| {
            QuinielaError::Parse(format!(
                "match {} has invalid date '{}': {}",
                self.match_id, self.date, e
            ))
        })?;
        Ok(MatchRecord {
            match_id: self.match_id,
            date,
            home_team: self.home_team,
            away_team: self.away_team,
            home_goals: self.home_goals,
            away_goals: self.away_goals,
            odds_home: self.odds_home,
            odds_draw: self.odds_draw,
            odds_away: self.odds_away,
            implied_home: self.implied_home,
            implied_draw: self.implied_draw,
            implied_away: self.implied_away,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub match_count: usize,
    pub resolved_count: usize,
    pub team_count: usize,
    pub earliest_match: Option<NaiveDate>,
    pub latest_match: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.match_count, 0);
        assert_eq!(stats.team_count, 0);
        assert!(stats.earliest_match.is_none());
        assert!(db.get_all_matches().unwrap().is_empty());
    }

    #[test]
    fn test_insert_match() {
        let db = Database::in_memory().unwrap();
        let record = MatchRecord::new("m1", date(1), "Real Madrid", "Sevilla")
            .with_score(3, 1)
            .with_odds(1.45, 4.5, 7.0);
        db.upsert_match(&record).unwrap();

        let loaded = db.get_all_matches().unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let db = Database::in_memory().unwrap();
        db.upsert_match(&MatchRecord::new("m1", date(1), "A", "B"))
            .unwrap();
        db.upsert_match(&MatchRecord::new("m2", date(2), "C", "D"))
            .unwrap();
        db.upsert_match(&MatchRecord::new("m1", date(1), "A", "B").with_score(0, 0))
            .unwrap();

        let all = db.get_all_matches().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].match_id, "m1");
        assert_eq!(all[0].score(), Some((0, 0)));
        assert_eq!(all[1].match_id, "m2");
    }

    #[test]
    fn test_stats() {
        let db = Database::in_memory().unwrap();
        let records = vec![
            MatchRecord::new("m1", date(3), "A", "B").with_score(1, 0),
            MatchRecord::new("m2", date(1), "B", "C").with_score(2, 2),
            MatchRecord::new("m3", date(9), "C", "A"),
        ];
        assert_eq!(db.upsert_matches(&records).unwrap(), 3);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.match_count, 3);
        assert_eq!(stats.resolved_count, 2);
        assert_eq!(stats.team_count, 3);
        assert_eq!(stats.earliest_match, Some(date(1)));
        assert_eq!(stats.latest_match, Some(date(9)));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("matches.db");
        let db = Database::open(&path).unwrap();
        db.upsert_match(&MatchRecord::new("m1", date(1), "A", "B"))
            .unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get_all_matches().unwrap().len(), 1);
    }
}
