//! Key-value store contracts and implementations.
//!
//! # Invariants
//! - `set` is an upsert.
//! - Values are opaque text; callers own the encoding.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type RepoResult<T> = Result<T, RepoError>;

/// Key-value storage failure.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "key-value store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous durable key-value store.
pub trait KvStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed key-value store over the `kv_entries` table.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Wraps an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a migrated in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> RepoResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
