// Migration runner. diesel_migrations requires sync connections, so
// migrations run on a blocking task against their own SqliteConnection.

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_migrations::MigrationHarness;
use std::error::Error;
use tracing::{debug, info};

use crate::db::MIGRATIONS;

/// Run all pending migrations against the given database.
/// Returns the number of migrations applied.
pub async fn run_migrations(database_url: &str) -> Result<usize, Box<dyn Error + Send + Sync>> {
    let database_url = database_url.to_string();

    let applied_count =
        tokio::task::spawn_blocking(move || -> Result<usize, Box<dyn Error + Send + Sync>> {
            let mut conn = SqliteConnection::establish(&database_url)
                .map_err(|e| format!("Failed to establish sync connection: {}", e))?;

            let pending = conn
                .pending_migrations(MIGRATIONS)
                .map_err(|e| format!("Failed to check pending migrations: {}", e))?;

            if pending.is_empty() {
                debug!("No pending migrations found");
                return Ok(0);
            }

            info!("Found {} pending migrations", pending.len());

            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| format!("Failed to run migrations: {}", e))?;

            for migration in &applied {
                debug!("Applied migration: {}", migration);
            }

            Ok(applied.len())
        })
        .await
        .map_err(|e| format!("Migration task panicked: {}", e))??;

    if applied_count > 0 {
        info!("Applied {} migrations", applied_count);
    }

    Ok(applied_count)
}
