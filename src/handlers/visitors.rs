// Visitor listing and CSV export

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::{
    app::AppState,
    models::visitor::PageQuery,
    services::{access::AccessService, visitor::VisitorService},
    utils::{client_ip, user_agent, ServiceError},
};

pub async fn list_visitors(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    Query(query): Query<PageQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let access = AccessService::new(&state);
    let ctx = access.verify(&access_token, ip, agent.as_deref()).await?;

    let page = VisitorService::new(state.pool.clone())
        .list_page(&ctx, query.page.unwrap_or(1))
        .await?;

    Ok(Json(json!({
        "visitors": page.visitors,
        "pagination": page.pagination,
    })))
}

pub async fn export_visitors(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let ip = client_ip(&headers, Some(peer));
    let agent = user_agent(&headers);

    let access = AccessService::new(&state);
    let ctx = access.verify(&access_token, ip, agent.as_deref()).await?;

    let csv = VisitorService::new(state.pool.clone()).export_csv(&ctx).await?;
    access
        .log_action(&ctx, "visitor_export", Some("visitors.csv"), ip)
        .await;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"visitors.csv\"",
            ),
        ],
        csv,
    ))
}
