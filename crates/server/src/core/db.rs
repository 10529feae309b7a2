//! Connection manager
//!
//! Owns the SQLite pool for the process lifetime. The pool is created on
//! first use; concurrent first requests wait on the same attempt, and a
//! failed attempt leaves the slot empty so the next request retries.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct Database {
    url: String,
    pool: Mutex<Option<SqlitePool>>,
}

impl Database {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: Mutex::new(None),
        }
    }

    /// Get the shared pool, connecting if this is the first use or the
    /// previous pool was closed.
    pub async fn pool(&self) -> Result<SqlitePool, sqlx::Error> {
        let mut slot = self.pool.lock().await;
        if let Some(pool) = slot.as_ref() {
            if !pool.is_closed() {
                return Ok(pool.clone());
            }
            warn!("[Db] Pool was closed, reconnecting");
        }

        match self.connect().await {
            Ok(pool) => {
                *slot = Some(pool.clone());
                Ok(pool)
            }
            Err(e) => {
                *slot = None;
                warn!("[Db] Connection attempt failed, will retry on next request: {}", e);
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(20))
            .connect_with(options)
            .await?;

        init_schema(&pool).await?;
        info!("[Db] Connected to {}", self.url);
        Ok(pool)
    }

    /// Close the pool on shutdown. A later `pool()` call reconnects.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            info!("[Db] Pool closed");
        }
    }
}

async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            technologies TEXT NOT NULL,
            github_url TEXT,
            live_demo_url TEXT,
            image_data BLOB,
            image_content_type TEXT,
            image_filename TEXT,
            image_size INTEGER,
            image_digest TEXT,
            owner_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (title, owner_id),
            FOREIGN KEY (owner_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
