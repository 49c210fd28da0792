//! Persistence gateway.
//!
//! A [`Database`] is built once per process and handed to everything that
//! needs storage. The pool behind it holds exactly one connection which is
//! never reaped, so repeated startups cannot pile up connections and
//! `sqlite::memory:` databases survive for the life of the handle.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id          BLOB PRIMARY KEY NOT NULL,
    title       TEXT NOT NULL,
    completed   BOOLEAN NOT NULL DEFAULT FALSE,
    priority    TEXT NOT NULL DEFAULT 'LOW',
    created_at  TEXT NOT NULL
)
"#;

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        log::debug!("opened database handle for {url}");
        Ok(Self { pool })
    }

    /// Connects to a private in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let db = Self::connect("sqlite::memory:").await?;
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
