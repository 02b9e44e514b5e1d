//! Database connection and operations for auth.db.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::error::AuthResult;

/// Authentication database handle.
///
/// Manages the SQLite connection pool for auth.db, which holds the stored
/// token pair and the cached user profile. See [`crate::credentials`] for
/// the operations layered on top of this handle.
#[derive(Debug, Clone)]
pub struct AuthDb {
    pool: SqlitePool,
}

impl AuthDb {
    /// Open or create an auth database at the given path.
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run any pending migrations
    /// 3. Configure SQLite for optimal performance (WAL mode, etc.)
    pub async fn open(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy();
        info!("Opening auth database: {}", path_str);

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Recommended SQLite pragmas for performance
            .pragma("cache_size", "-16000") // 16MB cache
            .pragma("synchronous", "NORMAL") // Safe with WAL
            .pragma("temp_store", "MEMORY")
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(3) // Auth db has little concurrent access
            .connect_with(options)
            .await?;

        debug!("Auth database connection established");

        // Run migrations
        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> AuthResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(1) // In-memory must be single connection to share state
            .connect_with(options)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    async fn run_migrations(pool: &SqlitePool) -> AuthResult<()> {
        debug!("Running auth database migrations");
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Auth database migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> AuthResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
