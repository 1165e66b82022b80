//! DuckDB session store
//!
//! Persists the single active login session in `session.duckdb` so the
//! CLI stays logged in between invocations.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};

use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{Session, User};
use crate::ports::SessionStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
pub fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

fn db_err(e: duckdb::Error) -> Error {
    Error::database(e.to_string())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

/// DuckDB-backed [`SessionStore`]
pub struct DuckDbSessionStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbSessionStore {
    /// Open (or create) the session database and apply migrations
    ///
    /// Retries with exponential backoff when another `vz` process holds
    /// the file lock.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[vuluz] Session database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        MigrationService::new(&conn).run_pending()
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

impl SessionStore for DuckDbSessionStore {
    fn load(&self) -> DomainResult<Option<Session>> {
        let conn = self.lock()?;
        let row: Option<(String, Option<String>, i64, i64)> = conn
            .query_row(
                "SELECT token, user_json, created_at, last_activity FROM sys_session WHERE slot = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(db_err)?;

        let Some((token, user_json, created_at, last_activity)) = row else {
            return Ok(None);
        };

        // A profile that no longer parses is dropped; the token still stands
        let user = user_json.and_then(|json| serde_json::from_str::<User>(&json).ok());

        Ok(Some(Session {
            token,
            user,
            created_at: from_millis(created_at),
            last_activity: from_millis(last_activity),
        }))
    }

    fn save(&self, session: &Session) -> DomainResult<()> {
        let user_json = session
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO sys_session (slot, token, user_json, created_at, last_activity)
            VALUES (1, ?, ?, ?, ?)
            "#,
            params![
                &session.token,
                &user_json,
                session.created_at.timestamp_millis(),
                session.last_activity.timestamp_millis(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn touch(&self, at: DateTime<Utc>) -> DomainResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sys_session SET last_activity = ? WHERE slot = 1",
            params![at.timestamp_millis()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn clear(&self) -> DomainResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sys_session", []).map_err(db_err)?;
        Ok(())
    }
}
