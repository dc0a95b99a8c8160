// Health endpoint. Doubles as an opportunistic maintenance trigger so
// low-traffic deployments still restrict expired trials between sweeps.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use crate::{
    app::AppState, db::check_db_health, services::background_tasks::run_maintenance_cycle,
};

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = check_db_health(&state.pool).await.is_ok();

    let report = match run_maintenance_cycle(&state).await {
        Ok(report) => report,
        Err(e) => {
            warn!("maintenance cycle during health check failed: {}", e);
            Default::default()
        }
    };

    Json(json!({
        "status": if db_healthy { "healthy" } else { "degraded" },
        "database": db_healthy,
        "environment": state.config.environment.to_string(),
        "maintenance": {
            "restricted_trials": report.restricted_trials,
            "sessions_closed": report.sessions_closed,
            "notifications_sent": report.notifications_sent,
            "tasks_executed": report.tasks_executed,
        }
    }))
}
