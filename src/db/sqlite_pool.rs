// SQLite connection pool: Diesel sync connections wrapped for async use,
// pooled with bb8 (same pooling layer the rest of the stack expects).

use bb8::Pool;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use std::time::Duration;

// Embed migrations at compile time
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;
pub type DbPool = Pool<AsyncDieselConnectionManager<DbConnection>>;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let config = crate::app_config::config();
        Self {
            url: config.database_url.clone(),
            max_connections: config.database_max_connections,
            connection_timeout: Duration::from_secs(config.database_connect_timeout),
        }
    }
}

/// Create the SQLite connection pool
pub async fn create_db_pool(config: DatabaseConfig) -> Result<DbPool, anyhow::Error> {
    let manager = AsyncDieselConnectionManager::<DbConnection>::new(config.url.clone());

    let pool = Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .await?;

    // Test the connection
    let conn = pool.get().await?;
    drop(conn);

    tracing::info!(
        "SQLite pool initialized ({}) with {} max connections",
        mask_database_path(&config.url),
        config.max_connections
    );

    Ok(pool)
}

/// Health check for the database pool
pub async fn check_db_health(pool: &DbPool) -> Result<(), anyhow::Error> {
    let conn = pool.get().await?;
    drop(conn);
    Ok(())
}

/// Keep absolute filesystem paths out of log lines
pub fn mask_database_path(url: &str) -> String {
    std::path::Path::new(url)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<in-memory>".to_string())
}
