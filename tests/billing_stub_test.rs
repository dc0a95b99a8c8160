// Billing stubs: seeded plans, webhook state transitions, status lookups

mod common;

use axum::http::StatusCode;
use common::{setup_test_app, TestApp};
use serde_json::json;

async fn create_paid_client(app: &TestApp) -> (String, String) {
    let response = app
        .post("/admin/clients")
        .json(&json!({
            "business_name": "Paid Business",
            "contact_email": "owner@paid-business.example",
            "website_url": "https://paid-business.example",
            "plan_type": "basic"
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json().await;
    (
        body["client_id"].as_str().unwrap().to_string(),
        body["access_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn plans_are_seeded_and_listed_by_price() {
    let app = setup_test_app().await;

    let response = app.get("/api/v1/plans").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json().await;

    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["plan_id"], "basic");
    assert_eq!(plans[0]["price_monthly"], 29.99);
    assert_eq!(plans[0]["max_users"], 5);
    assert_eq!(plans[1]["plan_id"], "professional");
    assert_eq!(plans[2]["plan_id"], "enterprise");
    assert_eq!(plans[2]["price_yearly"], 1999.99);
}

#[tokio::test]
async fn payment_failure_and_recovery_move_client_status() {
    let app = setup_test_app().await;
    let (client_id, token) = create_paid_client(&app).await;

    let failed = app
        .post("/api/v1/webhooks/stripe")
        .json(&json!({
            "type": "invoice.payment_failed",
            "client_id": client_id
        }))
        .send()
        .await;
    assert_eq!(failed.status(), StatusCode::OK);
    assert_eq!(failed.json().await["outcome"], "payment_failed");

    let status = app
        .get(&format!("/api/v1/subscription/{}", client_id))
        .send()
        .await
        .json()
        .await;
    assert_eq!(status["subscription_status"], "payment_failed");
    assert_eq!(status["recent_transactions"].as_array().unwrap().len(), 1);

    // a failed subscription no longer verifies
    let denied = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let recovered = app
        .post("/api/v1/webhooks/stripe")
        .json(&json!({
            "type": "invoice.payment_succeeded",
            "client_id": client_id
        }))
        .send()
        .await;
    assert_eq!(recovered.json().await["outcome"], "payment_succeeded");

    let restored = app.get(&format!("/dashboard/{}", token)).send().await;
    assert_eq!(restored.status(), StatusCode::OK);
}

#[tokio::test]
async fn paypal_cancellation_is_recorded() {
    let app = setup_test_app().await;
    let (client_id, _token) = create_paid_client(&app).await;

    let cancelled = app
        .post("/api/v1/webhooks/paypal")
        .json(&json!({
            "event_type": "BILLING.SUBSCRIPTION.CANCELLED",
            "client_id": client_id
        }))
        .send()
        .await;
    assert_eq!(cancelled.status(), StatusCode::OK);
    assert_eq!(cancelled.json().await["outcome"], "subscription_cancelled");

    let status = app
        .get(&format!("/api/v1/subscription/{}", client_id))
        .send()
        .await
        .json()
        .await;
    assert_eq!(status["subscription_status"], "cancelled");
}

#[tokio::test]
async fn checkout_then_activation_webhook_resolves_the_client() {
    let app = setup_test_app().await;
    let (client_id, _token) = create_paid_client(&app).await;

    let created = app
        .post(&format!("/api/v1/subscription/{}", client_id))
        .json(&json!({
            "plan_id": "professional",
            "provider": "paypal",
            "billing_cycle": "yearly"
        }))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let body = created.json().await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["amount"], 799.99);
    let subscription_id = body["subscription_id"].as_str().unwrap().to_string();

    // the activation webhook carries only the subscription id
    let activated = app
        .post("/api/v1/webhooks/paypal")
        .json(&json!({
            "event_type": "BILLING.SUBSCRIPTION.ACTIVATED",
            "subscription_id": subscription_id
        }))
        .send()
        .await;
    assert_eq!(activated.status(), StatusCode::OK);
    assert_eq!(activated.json().await["outcome"], "payment_succeeded");

    let status = app
        .get(&format!("/api/v1/subscription/{}", client_id))
        .send()
        .await
        .json()
        .await;
    assert_eq!(status["subscription"]["status"], "active");
    assert_eq!(status["subscription_status"], "active");
    assert_eq!(
        status["recent_transactions"][0]["subscription_id"],
        subscription_id.as_str()
    );
}

#[tokio::test]
async fn unknown_subscription_plan_is_rejected() {
    let app = setup_test_app().await;
    let (client_id, _token) = create_paid_client(&app).await;

    let response = app
        .post(&format!("/api/v1/subscription/{}", client_id))
        .json(&json!({"plan_id": "platinum"}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_events_change_nothing() {
    let app = setup_test_app().await;
    let (client_id, _token) = create_paid_client(&app).await;

    let response = app
        .post("/api/v1/webhooks/stripe")
        .json(&json!({
            "type": "customer.created",
            "client_id": client_id
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json().await["outcome"], "ignored");

    let status = app
        .get(&format!("/api/v1/subscription/{}", client_id))
        .send()
        .await
        .json()
        .await;
    assert_eq!(status["subscription_status"], "active");
    assert!(status["recent_transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unattributable_events_are_rejected() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/webhooks/stripe")
        .json(&json!({"type": "invoice.payment_failed"}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_client_status_lookup_is_404() {
    let app = setup_test_app().await;
    let response = app
        .get("/api/v1/subscription/client_does_not_exist")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
