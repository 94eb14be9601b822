//! Data ingestion and storage
//!
//! CSV import and SQLite management of the match table.

pub mod database;
pub mod import;

pub use database::{Database, DatabaseStats};
pub use import::{read_csv, read_csv_file, ImportResult};
