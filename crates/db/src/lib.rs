//! SQLite connection pool factory and migration runner.

use std::str::FromStr;

use libris_kernel::{settings::DatabaseSettings, Migration};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use time::OffsetDateTime;

mod error;

pub use error::DbError;

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (module, id)
)";

/// Shared handle to the SQLite pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database named by `settings.url`.
    ///
    /// In-memory databases live only as long as their connection, so they are
    /// pinned to a single connection that is never recycled.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .map_err(|source| DbError::InvalidUrl {
                url: settings.url.clone(),
                source,
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if is_in_memory(&settings.url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(DbError::Connect)?;

        tracing::info!(target: "libris-db", url = %settings.url, "connected to database");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Each migration runs in its own transaction together with its
    /// bookkeeping row. Returns how many were applied.
    pub async fn run_migrations(&self, migrations: &[(String, Migration)]) -> Result<usize, DbError> {
        sqlx::query(MIGRATIONS_TABLE).execute(&self.pool).await?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let existing: Option<String> =
                sqlx::query_scalar("SELECT id FROM schema_migrations WHERE module = ? AND id = ?")
                    .bind(module)
                    .bind(migration.id)
                    .fetch_optional(&self.pool)
                    .await?;

            if existing.is_some() {
                tracing::debug!(target: "libris-db", module = %module, id = migration.id, "migration already applied");
                continue;
            }

            let mut tx = self.pool.begin().await?;

            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .map_err(|source| DbError::Migration {
                    module: module.clone(),
                    id: migration.id.to_string(),
                    source,
                })?;

            sqlx::query("INSERT INTO schema_migrations (module, id, applied_at) VALUES (?, ?, ?)")
                .bind(module)
                .bind(migration.id)
                .bind(OffsetDateTime::now_utc())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!(target: "libris-db", module = %module, id = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
