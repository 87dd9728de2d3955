pub mod credentials;
pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

/// Handle to the SQLite file. Every operation opens its own connection and
/// drops it when done; SQLite's file locking is the only concurrency control.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        // Foreign key enforcement is per connection in SQLite.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// Like [`Database::with_conn`], for operations that need a transaction.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.connect()?;
        f(&mut conn)
    }
}

/// Current time in the text format stored in `created_at` columns.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use tempfile::TempDir;

    /// Fresh database in a temp dir. Keep the `TempDir` alive for the test.
    pub fn temp_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db = Database::open(&dir.path().join("helpdesk.db")).expect("Failed to open database");
        (dir, db)
    }
}
