pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

pub use pool::PoolSettings;
pub use queries::relations::{Relation, ToggleOutcome};

/// Handle to the shared connection pool. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect, then bring the schema up to date.
    pub async fn connect(settings: &PoolSettings) -> Result<Self> {
        let pool = pool::create_pool(settings).await?;
        migrations::run(&pool).await?;

        info!(
            "Database ready at {} (max {} connections)",
            settings.url, settings.max_connections
        );
        Ok(Self { pool })
    }

    /// Open a migrated in-memory database (for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let pool = pool::create_memory_pool().await?;
        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// True when `err` came from a write that hit a UNIQUE constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation())
}
