// Admin endpoints: client provisioning and listing

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    app::AppState,
    models::client::CreateClientRequest,
    services::client::ClientService,
    utils::ServiceError,
};

pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let service = ClientService::new(state.pool.clone(), state.config.dashboard_base_url.clone());
    let response = service.create_client(req).await?;
    Ok(Json(response))
}

pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let service = ClientService::new(state.pool.clone(), state.config.dashboard_base_url.clone());
    let clients = service.list_clients().await?;
    let total = clients.len();
    Ok(Json(json!({
        "clients": clients,
        "total": total
    })))
}
