// Library exports for the visitor investigation backend

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

pub use app::AppState;
pub use app_config::{config, AppConfig, CONFIG};
pub use db::{DatabaseConfig, DbConnection, DbPool};
pub use services::access::{AccessService, UserContext};
pub use utils::ServiceError;

use axum::{
    routing::{get, post},
    Router,
};

/// Initialize config, pool, and migrations, returning the shared state
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = app_config::config();

    tracing::info!("Initializing database pool...");
    let db_config = db::DatabaseConfig::default();
    let pool = db::create_db_pool(db_config).await?;

    tracing::info!("Running embedded migrations...");
    migrations::run_migrations(&config.database_url)
        .await
        .map_err(|e| format!("Migration failed: {}", e))?;

    Ok(AppState::new(pool, config))
}

/// The full route table
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/admin/clients",
            get(handlers::admin::list_clients).post(handlers::admin::create_client),
        )
        .route(
            "/api/v1/trials",
            get(handlers::trials::list_trials).post(handlers::trials::create_trial),
        )
        .route(
            "/api/v1/trials/{client_id}/extend",
            post(handlers::trials::extend_trial),
        )
        .route(
            "/api/v1/trials/{client_id}/convert",
            post(handlers::trials::convert_trial),
        )
        .route(
            "/api/v1/trials/{client_id}/restrict",
            post(handlers::trials::restrict_trial),
        )
        .route("/dashboard/{access_token}", get(handlers::dashboard::dashboard))
        .route(
            "/api/v1/visitors/{access_token}",
            get(handlers::visitors::list_visitors),
        )
        .route(
            "/api/v1/visitors/{access_token}/export",
            get(handlers::visitors::export_visitors),
        )
        .route(
            "/api/v1/users/{access_token}",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/v1/users/{access_token}/{target_user_id}/restrict",
            post(handlers::users::restrict_user),
        )
        .route(
            "/api/v1/access-logs/{access_token}",
            get(handlers::users::access_logs),
        )
        .route("/api/v1/countries", get(handlers::dashboard::list_countries))
        .route("/api/v1/plans", get(handlers::payments::list_plans))
        .route(
            "/api/v1/subscription/{client_id}",
            get(handlers::payments::subscription_status)
                .post(handlers::payments::create_subscription),
        )
        .route("/api/v1/webhooks/stripe", post(handlers::payments::stripe_webhook))
        .route("/api/v1/webhooks/paypal", post(handlers::payments::paypal_webhook))
        .layer(axum::middleware::from_fn(
            middleware::dynamic_cors_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
