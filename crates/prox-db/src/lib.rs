//! # prox-db
//!
//! libSQL persistence for the Proxima pipeline.
//!
//! Owns the work queue, cache store, nearby reverse index, compute locks,
//! discovery state, and review queue. Also carries the `locations` tables
//! behind a SQL implementation of [`prox_core::store::EntityStore`].
//!
//! Every mutation that other workers can race on is a single statement
//! (`INSERT … ON CONFLICT`, `UPDATE … RETURNING`), so one shared connection
//! is safe to use from concurrent tasks.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod retry;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle for pipeline state.
#[derive(Debug)]
pub struct ProxDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl ProxDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        if path != ":memory:" {
            // The CLI and a running `serve` loop may share the file.
            conn.query("PRAGMA journal_mode = WAL", ())
                .await
                .map_err(|e| DatabaseError::Migration(format!("PRAGMA journal_mode: {e}")))?;
            conn.query("PRAGMA busy_timeout = 5000", ())
                .await
                .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
        }

        let prox_db = Self { db, conn };
        prox_db.run_migrations().await?;
        tracing::debug!(path, "database opened");
        Ok(prox_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
