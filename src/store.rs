//! Durable client state
//!
//! A small key/value table standing in for browser local storage. Only the
//! interface language and the auth token are kept.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::locale::Language;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

const LANGUAGE_KEY: &str = "language";
const AUTH_TOKEN_KEY: &str = "auth_token";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Cannot create store directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe handle to the settings table
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(key, "Stored setting");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.conn()
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ==================== Typed accessors ====================

    /// Persisted language, or `None` if never set
    pub fn language(&self) -> StoreResult<Option<Language>> {
        Ok(self
            .get(LANGUAGE_KEY)?
            .map(|v| Language::from_stored(Some(&v))))
    }

    pub fn set_language(&self, language: Language) -> StoreResult<()> {
        self.set(LANGUAGE_KEY, language.as_str())
    }

    pub fn auth_token(&self) -> StoreResult<Option<String>> {
        self.get(AUTH_TOKEN_KEY)
    }

    pub fn set_auth_token(&self, token: &str) -> StoreResult<()> {
        self.set(AUTH_TOKEN_KEY, token)
    }

    pub fn remove_auth_token(&self) -> StoreResult<()> {
        self.remove(AUTH_TOKEN_KEY)
    }
}
