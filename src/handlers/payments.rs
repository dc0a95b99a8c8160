// Billing endpoints: plan listing, webhook stubs, subscription status

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    app::AppState,
    models::payment::{CreateSubscriptionRequest, WebhookEvent, PROVIDER_PAYPAL, PROVIDER_STRIPE},
    services::payment::PaymentService,
    utils::ServiceError,
};

pub async fn list_plans(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let plans = PaymentService::new(state.pool.clone()).list_plans().await?;
    Ok(Json(json!({ "plans": plans })))
}

pub async fn subscription_status(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = PaymentService::new(state.pool.clone())
        .subscription_status(&client_id)
        .await?;
    Ok(Json(status))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = PaymentService::new(state.pool.clone())
        .create_subscription(&client_id, req)
        .await?;
    Ok(Json(response))
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = PaymentService::new(state.pool.clone())
        .handle_webhook(PROVIDER_STRIPE, event)
        .await?;
    Ok(Json(json!({
        "success": true,
        "outcome": outcome.as_str(),
    })))
}

pub async fn paypal_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = PaymentService::new(state.pool.clone())
        .handle_webhook(PROVIDER_PAYPAL, event)
        .await?;
    Ok(Json(json!({
        "success": true,
        "outcome": outcome.as_str(),
    })))
}
