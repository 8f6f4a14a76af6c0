use thiserror::Error;

/// Errors raised by the storage layer
#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}
