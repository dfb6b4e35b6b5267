//! Persistence layer
//!
//! Record-level functions take a `&Connection` and are composed by callers
//! inside [`Database::call`]. Uniqueness is enforced by the schema and
//! surfaces as [`StoreError::Conflict`].

pub mod activities;
pub mod admins;
mod db;
pub mod mdas;
pub mod users;

pub use db::{Database, Page};
pub(crate) use db::{from_db_time, from_db_time_opt, like_pattern, to_db_time};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// UNIQUE constraint violation on the named column
    #[error("duplicate value for {0}")]
    Conflict(String),
    /// Row is still referenced by a foreign key
    #[error("record is still referenced")]
    InUse,
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
    #[error("database task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref message) = err {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                // "UNIQUE constraint failed: mdas.name"
                let column = message
                    .as_deref()
                    .and_then(|m| m.rsplit('.').next())
                    .unwrap_or("value");
                return StoreError::Conflict(column.to_string());
            }
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                return StoreError::InUse;
            }
        }
        StoreError::Sqlite(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Build `WHERE ...` from accumulated clauses
pub(crate) fn where_sql(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}
