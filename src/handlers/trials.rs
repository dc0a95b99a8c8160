// Trial management endpoints

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    app::AppState,
    models::{
        client::PlanType,
        trial::{ConvertTrialRequest, CreateTrialRequest, ExtendTrialRequest},
    },
    services::trial::TrialService,
    utils::ServiceError,
};

fn trial_service(state: &AppState) -> TrialService {
    TrialService::new(state.pool.clone(), state.config.dashboard_base_url.clone())
}

pub async fn create_trial(
    State(state): State<AppState>,
    Json(req): Json<CreateTrialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;
    let response = trial_service(&state).create_trial(req).await?;
    Ok(Json(response))
}

pub async fn list_trials(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let trials = trial_service(&state).list_trials().await?;
    let total = trials.len();
    Ok(Json(json!({
        "trials": trials,
        "total": total
    })))
}

pub async fn extend_trial(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(req): Json<ExtendTrialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_end = trial_service(&state)
        .extend_trial(&client_id, req.additional_hours)
        .await?;
    Ok(Json(json!({
        "success": true,
        "client_id": client_id,
        "new_end_time": new_end,
        "extended_by": req.extended_by,
    })))
}

pub async fn convert_trial(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(req): Json<ConvertTrialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let plan: PlanType = req
        .plan_type
        .as_deref()
        .unwrap_or("basic")
        .parse()
        .map_err(ServiceError::ValidationError)?;

    trial_service(&state).convert_trial(&client_id, plan).await?;
    Ok(Json(json!({
        "success": true,
        "client_id": client_id,
        "plan_type": plan.as_str(),
    })))
}

pub async fn restrict_trial(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let restricted = trial_service(&state).restrict_trial(&client_id, true).await?;
    Ok(Json(json!({
        "success": true,
        "client_id": client_id,
        "newly_restricted": restricted,
    })))
}
