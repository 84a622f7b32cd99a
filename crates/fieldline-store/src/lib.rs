#![forbid(unsafe_code)]

//! SQLite-backed document store. One JSON document per row, every write an
//! unconditional upsert (last write wins), every tenant-scoped read keyed by
//! `company_id`. No transactions span more than one statement.

use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

mod accounts;
mod documents;
mod schema;

pub use documents::TenantCounts;

pub const CRATE_NAME: &str = "fieldline-store";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No document with that id inside the caller's tenant scope.
    NotFound(&'static str),
    /// `users.email` is unique across all tenants.
    EmailExists,
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::EmailExists => write!(f, "a user with this email already exists"),
            Self::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub(crate) fn map_sqlite_err(op: &str, err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(f, Some(msg))
            if f.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("users.email") =>
        {
            StoreError::EmailExists
        }
        other => StoreError::Backend(format!("{op}: {other}")),
    }
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if needed) the database file and applies the schema.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let path: PathBuf = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StoreError::Backend(format!("create data dir: {e}")))?;
                }
            }
            let conn = Connection::open(&path)
                .map_err(|e| map_sqlite_err("open database", e))?;
            conn.busy_timeout(std::time::Duration::from_secs(5))
                .map_err(|e| map_sqlite_err("set busy timeout", e))?;
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| map_sqlite_err("set journal mode", e))?;
            conn.execute_batch(schema::SCHEMA_SQL)
                .map_err(|e| map_sqlite_err("apply schema", e))?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("open task join: {e}")))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests and local development.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| map_sqlite_err("open in-memory database", e))?;
        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(|e| map_sqlite_err("apply schema", e))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fieldline.db");
        let store = Store::open(&path).await.unwrap();
        drop(store);
        assert!(path.exists());
    }

    #[test]
    fn store_error_messages_are_stable() {
        assert_eq!(StoreError::NotFound("client").to_string(), "client not found");
        assert_eq!(
            StoreError::EmailExists.to_string(),
            "a user with this email already exists"
        );
    }
}
