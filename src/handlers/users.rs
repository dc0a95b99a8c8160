// User management and audit log endpoints, all token-gated

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

use crate::{
    app::AppState,
    models::client_user::CreateUserRequest,
    services::{access::AccessService, client::ClientService},
    utils::{client_ip, user_agent, ServiceError},
};

#[derive(Debug, Deserialize)]
pub struct RestrictUserRequest {
    #[serde(default = "default_restricted")]
    pub restricted: bool,
}

fn default_restricted() -> bool {
    true
}

pub async fn list_users(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let ctx = AccessService::new(&state)
        .verify(&access_token, ip, agent.as_deref())
        .await?;

    let users = ClientService::new(state.pool.clone(), state.config.dashboard_base_url.clone())
        .list_users(&ctx)
        .await?;
    let total = users.len();

    Ok(Json(json!({
        "users": users,
        "total": total,
    })))
}

pub async fn create_user(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let access = AccessService::new(&state);
    let ctx = access.verify(&access_token, ip, agent.as_deref()).await?;

    let response = ClientService::new(state.pool.clone(), state.config.dashboard_base_url.clone())
        .create_user(&ctx, req)
        .await?;
    access
        .log_action(&ctx, "user_created", Some(&response.user_id), ip)
        .await;

    Ok(Json(response))
}

pub async fn restrict_user(
    State(state): State<AppState>,
    Path((access_token, target_user_id)): Path<(String, String)>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RestrictUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let access = AccessService::new(&state);
    let ctx = access.verify(&access_token, ip, agent.as_deref()).await?;

    let new_status = ClientService::new(state.pool.clone(), state.config.dashboard_base_url.clone())
        .set_user_restricted(&ctx, &target_user_id, req.restricted)
        .await?;
    let action = if req.restricted {
        "user_restricted"
    } else {
        "user_unrestricted"
    };
    access.log_action(&ctx, action, Some(&target_user_id), ip).await;

    Ok(Json(json!({
        "success": true,
        "user_id": target_user_id,
        "status": new_status,
    })))
}

pub async fn access_logs(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let access = AccessService::new(&state);
    let ctx = access.verify(&access_token, ip, agent.as_deref()).await?;

    if !ctx.has_permission("view_audit_logs") {
        return Err(ServiceError::PermissionDenied);
    }

    let logs = access.recent_logs(&ctx.client_id, 100).await?;
    let total = logs.len();

    Ok(Json(json!({
        "logs": logs,
        "total": total,
    })))
}
