pub mod audio;
pub mod concept_maps;
pub mod conversations;
pub mod feynman;
pub mod flashcards;
pub mod goals;
pub mod quizzes;
pub mod schema;
pub mod sessions;
pub mod stats;
pub mod videos;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
    /// Log the error at warn level and return the default
    fn log_warn_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }

    fn log_warn_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                T::default()
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug, thiserror::Error)]
#[error("Database unavailable")]
pub struct DbLockError;

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

/// Open (creating if needed) the database file and bring its schema up to date
pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).log_warn("Could not create database directory");
  }

  let conn = Connection::open(path)?;
  prepare_connection(&conn)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database with the full schema
pub fn init_memory_db() -> Result<DbPool> {
  let conn = Connection::open_in_memory()?;
  prepare_connection(&conn)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

fn prepare_connection(conn: &Connection) -> Result<()> {
  conn.execute_batch("PRAGMA foreign_keys = ON;")?;
  conn.busy_timeout(std::time::Duration::from_secs(5))?;
  Ok(())
}

// ==================== Row helpers ====================

/// Fresh random row id
pub fn new_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

/// Timestamp as stored in TEXT columns. Fixed precision keeps lexical order
/// equal to chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
  format_timestamp(Utc::now())
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Read a non-null RFC 3339 timestamp column
pub fn timestamp_column(row: &rusqlite::Row, idx: usize) -> Result<DateTime<Utc>> {
  let raw: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| conversion_error(idx, e))
}

/// Read a nullable RFC 3339 timestamp column
pub fn optional_timestamp_column(row: &rusqlite::Row, idx: usize) -> Result<Option<DateTime<Utc>>> {
  let raw: Option<String> = row.get(idx)?;
  raw
    .map(|s| {
      DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

/// Read a nullable `YYYY-MM-DD` date column
pub fn optional_date_column(row: &rusqlite::Row, idx: usize) -> Result<Option<NaiveDate>> {
  let raw: Option<String> = row.get(idx)?;
  raw
    .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
    .transpose()
}

/// Read a TEXT column holding a JSON array of strings
pub fn string_list_column(row: &rusqlite::Row, idx: usize) -> Result<Vec<String>> {
  let raw: Option<String> = row.get(idx)?;
  match raw {
    Some(s) => serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)),
    None => Ok(Vec::new()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_init_db_creates_file_and_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("app.db");
    let pool = init_db(&path).unwrap();
    assert!(path.exists());

    let conn = try_lock(&pool).unwrap();
    let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
    assert_eq!(fk, 1);
  }

  #[test]
  fn test_reopen_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    drop(init_db(&path).unwrap());
    let pool = init_db(&path).unwrap();
    let conn = try_lock(&pool).unwrap();
    assert_eq!(schema::get_schema_version(&conn).unwrap(), schema::DB_VERSION);
  }

  #[test]
  fn test_timestamps_sort_lexically() {
    let earlier = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.5Z").unwrap().with_timezone(&Utc);
    let later = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.25Z").unwrap().with_timezone(&Utc)
      + chrono::Duration::seconds(1);
    assert!(format_timestamp(earlier) < format_timestamp(later));
    assert_eq!(format_timestamp(earlier), "2024-05-01T10:00:00.500000Z");
  }

  #[test]
  fn test_log_warn_default() {
    let failed: std::result::Result<i64, String> = Err("boom".into());
    assert_eq!(failed.log_warn_default("ignored"), 0);
    let ok: std::result::Result<i64, String> = Ok(3);
    assert_eq!(ok.log_warn("ignored"), Some(3));
  }
}
