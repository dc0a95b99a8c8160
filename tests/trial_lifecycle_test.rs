// Trial lifecycle: provisioning, demo data, restriction, extension,
// conversion.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_trial, setup_test_app};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use leadsight_backend::schema::{clients, trial_notifications, trials};
use serde_json::json;

#[tokio::test]
async fn create_trial_provisions_a_working_dashboard() {
    let app = setup_test_app().await;
    let (client_id, token) = create_trial(&app, 24).await;
    assert!(client_id.starts_with("client_"));

    let response = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.json().await;
    assert_eq!(body["user"]["role"], "owner");
    assert_eq!(body["user"]["is_trial"], true);
    assert_eq!(body["user"]["client_id"], client_id.as_str());
    assert!(body["user"]["trial_hours_remaining"].as_i64().unwrap() <= 24);
    assert!(body["session_id"].as_str().unwrap().starts_with("session_"));
}

#[tokio::test]
async fn trial_duration_is_bounded() {
    let app = setup_test_app().await;

    for bad_hours in [0, 8761] {
        let response = app
            .post("/api/v1/trials")
            .json(&json!({
                "business_name": "Test Business",
                "contact_email": "owner@test-business.example",
                "website_url": "https://test-business.example",
                "duration_hours": bad_hours
            }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn health_check_executes_demo_data_task() {
    let app = setup_test_app().await;
    let (_client_id, token) = create_trial(&app, 24).await;

    let health = app.get("/health").send().await;
    assert_eq!(health.status(), StatusCode::OK);
    let health_body = health.json().await;
    assert!(health_body["maintenance"]["tasks_executed"].as_u64().unwrap() >= 1);

    let page1 = app
        .get(&format!("/api/v1/visitors/{}", token))
        .send()
        .await;
    assert_eq!(page1.status(), StatusCode::OK);
    let body = page1.json().await;
    assert_eq!(body["pagination"]["total_visitors"], 75);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["visitors"].as_array().unwrap().len(), 50);
    assert_eq!(body["pagination"]["has_next"], true);

    let page2 = app
        .get(&format!("/api/v1/visitors/{}?page=2", token))
        .send()
        .await;
    let body = page2.json().await;
    assert_eq!(body["visitors"].as_array().unwrap().len(), 25);
    assert_eq!(body["pagination"]["has_prev"], true);
    assert_eq!(body["pagination"]["has_next"], false);
}

#[tokio::test]
async fn manual_restriction_locks_out_and_extension_restores() {
    let app = setup_test_app().await;
    let (client_id, token) = create_trial(&app, 24).await;

    let restrict = app
        .post(&format!("/api/v1/trials/{}/restrict", client_id))
        .json(&json!({}))
        .send()
        .await;
    assert_eq!(restrict.status(), StatusCode::OK);
    assert_eq!(restrict.json().await["newly_restricted"], true);

    let denied = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    // restricting again is a no-op
    let again = app
        .post(&format!("/api/v1/trials/{}/restrict", client_id))
        .json(&json!({}))
        .send()
        .await;
    assert_eq!(again.json().await["newly_restricted"], false);

    let extend = app
        .post(&format!("/api/v1/trials/{}/extend", client_id))
        .json(&json!({"additional_hours": 48}))
        .send()
        .await;
    assert_eq!(extend.status(), StatusCode::OK);

    let restored = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(restored.status(), StatusCode::OK);
}

#[tokio::test]
async fn conversion_upgrades_plan_and_permissions() {
    let app = setup_test_app().await;
    let (client_id, token) = create_trial(&app, 24).await;

    // trial owners cannot export
    let export_denied = app
        .get(&format!("/api/v1/visitors/{}/export", token))
        .send()
        .await;
    assert_eq!(export_denied.status(), StatusCode::FORBIDDEN);

    let convert = app
        .post(&format!("/api/v1/trials/{}/convert", client_id))
        .json(&json!({"plan_type": "professional"}))
        .send()
        .await;
    assert_eq!(convert.status(), StatusCode::OK);

    let status = app
        .get(&format!("/api/v1/subscription/{}", client_id))
        .send()
        .await;
    let body = status.json().await;
    assert_eq!(body["subscription_status"], "active");
    assert_eq!(body["account_type"], "full");
    assert_eq!(body["plan_type"], "professional");

    let export = app
        .get(&format!("/api/v1/visitors/{}/export", token))
        .send()
        .await;
    assert_eq!(export.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_trial_is_denied_and_swept() {
    let app = setup_test_app().await;
    let (client_id, token) = create_trial(&app, 24).await;

    // push the trial past its end time
    let past = Utc::now().naive_utc() - Duration::hours(1);
    {
        let mut conn = app.pool.get().await.unwrap();
        diesel::update(clients::table.filter(clients::client_id.eq(&client_id)))
            .set(clients::trial_end_time.eq(past))
            .execute(&mut conn)
            .await
            .unwrap();
    }

    // access after expiry restricts the caller on the spot
    let denied = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    // the client record is still trial-status, so the sweep picks it up
    let health = app.get("/health").send().await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.json().await["maintenance"]["restricted_trials"], 1);

    // the listing derives expiry from clients.trial_end_time, same as the
    // access check and the sweep, so it cannot contradict the 403 above
    let body = app.get("/api/v1/trials").send().await.json().await;
    let trial = &body["trials"][0];
    assert_eq!(trial["status"], "expired");
    assert_eq!(trial["subscription_status"], "trial_expired");
    assert_eq!(trial["is_expired"], true);
    assert!(trial["time_remaining_hours"].is_null());

    let still_denied = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(still_denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn due_notifications_set_the_trial_flags() {
    let app = setup_test_app().await;
    let (client_id, _token) = create_trial(&app, 24).await;

    // pull the whole schedule into the past
    let past = Utc::now().naive_utc() - Duration::minutes(5);
    {
        let mut conn = app.pool.get().await.unwrap();
        diesel::update(
            trial_notifications::table.filter(trial_notifications::client_id.eq(&client_id)),
        )
        .set(trial_notifications::scheduled_time.eq(past))
        .execute(&mut conn)
        .await
        .unwrap();
    }

    let health = app.get("/health").send().await;
    assert_eq!(health.status(), StatusCode::OK);
    let sent = health.json().await["maintenance"]["notifications_sent"]
        .as_u64()
        .unwrap();
    assert_eq!(sent, 3);

    let mut conn = app.pool.get().await.unwrap();
    let (reminder_sent, warning_sent): (bool, bool) = trials::table
        .filter(trials::client_id.eq(&client_id))
        .select((trials::reminder_sent, trials::expiration_warning_sent))
        .first(&mut conn)
        .await
        .unwrap();
    assert!(reminder_sent);
    assert!(warning_sent);
}

#[tokio::test]
async fn trial_listing_reports_remaining_time() {
    let app = setup_test_app().await;
    let (client_id, _token) = create_trial(&app, 48).await;

    let response = app.get("/api/v1/trials").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json().await;
    assert_eq!(body["total"], 1);

    let trial = &body["trials"][0];
    assert_eq!(trial["client_id"], client_id.as_str());
    assert_eq!(trial["status"], "active");
    assert_eq!(trial["is_expired"], false);
    let remaining = trial["time_remaining_hours"].as_i64().unwrap();
    assert!(remaining >= 46 && remaining <= 48);
}
