// Token-gated dashboard payload and the static country list

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::{
    app::AppState,
    services::{
        access::AccessService,
        geo::{GeoProvider, COUNTRIES, CONTINENTS},
        visitor::VisitorService,
    },
    utils::{client_ip, user_agent, ServiceError},
};

/// Dashboard bootstrap: verifies the token, opens a session, and returns
/// the caller context plus the first page of visitors.
pub async fn dashboard(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let access = AccessService::new(&state);
    let ctx = access.verify(&access_token, ip, agent.as_deref()).await?;

    let geo = match ip {
        Some(ip) => Some(state.geo.lookup(ip).await),
        None => None,
    };
    let session_id = access
        .create_session(&ctx, ip, agent.as_deref(), geo.as_ref())
        .await?;
    access
        .log_action(&ctx, "dashboard_access", Some("dashboard"), ip)
        .await;

    let page = VisitorService::new(state.pool.clone())
        .list_page(&ctx, 1)
        .await?;

    Ok(Json(json!({
        "user": ctx,
        "session_id": session_id,
        "visitors": page.visitors,
        "pagination": page.pagination,
    })))
}

/// Country codes and continent groups accepted in restriction rules
pub async fn list_countries() -> impl IntoResponse {
    let countries: Vec<_> = {
        let mut entries: Vec<_> = COUNTRIES
            .iter()
            .map(|(code, name)| json!({"code": code, "name": name}))
            .collect();
        entries.sort_by_key(|e| e["code"].as_str().map(str::to_string));
        entries
    };
    let continents: Vec<_> = {
        let mut codes: Vec<_> = CONTINENTS.keys().collect();
        codes.sort();
        codes
    };

    Json(json!({
        "countries": countries,
        "continents": continents,
    }))
}
