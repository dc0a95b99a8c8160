// Visitor listing: ordering, pagination edges, field filtering, CSV export

mod common;

use axum::http::StatusCode;
use common::{setup_test_app, TestApp};
use leadsight_backend::models::visitor::interest_rank;
use leadsight_backend::services::demo_data::DemoDataService;
use serde_json::json;

async fn create_paid_client(app: &TestApp) -> (String, String) {
    let response = app
        .post("/admin/clients")
        .json(&json!({
            "business_name": "Paid Business",
            "contact_email": "owner@paid-business.example",
            "website_url": "https://paid-business.example",
            "plan_type": "professional"
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
async fn listing_orders_by_interest_then_dwell_time() {
    let app = setup_test_app().await;
    let (client_id, token) = create_paid_client(&app).await;

    DemoDataService::new(app.pool.clone())
        .generate_visitors(&client_id, 60)
        .await
        .unwrap();

    let response = app.get(&format!("/api/v1/visitors/{}", token)).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json().await;

    let visitors = body["visitors"].as_array().unwrap();
    assert_eq!(visitors.len(), 50);
    for pair in visitors.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (ra, rb) = (
            interest_rank(a["interest_level"].as_str().unwrap()),
            interest_rank(b["interest_level"].as_str().unwrap()),
        );
        assert!(ra <= rb);
        if ra == rb {
            assert!(
                a["time_on_site_seconds"].as_i64().unwrap()
                    >= b["time_on_site_seconds"].as_i64().unwrap()
            );
        }
    }
}

#[tokio::test]
async fn out_of_range_page_is_empty_but_well_formed() {
    let app = setup_test_app().await;
    let (client_id, token) = create_paid_client(&app).await;

    DemoDataService::new(app.pool.clone())
        .generate_visitors(&client_id, 10)
        .await
        .unwrap();

    let response = app
        .get(&format!("/api/v1/visitors/{}?page=5", token))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json().await;
    assert_eq!(body["visitors"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total_visitors"], 10);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["has_next"], false);
}

#[tokio::test]
async fn contact_fields_are_masked_for_limited_viewers() {
    let app = setup_test_app().await;
    let (client_id, owner_token) = create_paid_client(&app).await;

    DemoDataService::new(app.pool.clone())
        .generate_visitors(&client_id, 75)
        .await
        .unwrap();

    let created = app
        .post(&format!("/api/v1/users/{}", owner_token))
        .json(&json!({
            "name": "Limited Viewer",
            "email": "viewer@paid-business.example",
            "role": "viewer",
            "permissions": {
                "view_contact_info": false,
                "view_email": false,
                "view_phone": false
            }
        }))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let viewer_token = created.json().await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let mut saw_contact = false;
    for page in 1..=2 {
        let body = app
            .get(&format!("/api/v1/visitors/{}?page={}", viewer_token, page))
            .send()
            .await
            .json()
            .await;
        for visitor in body["visitors"].as_array().unwrap() {
            if let Some(email) = visitor["email"].as_str() {
                saw_contact = true;
                assert_eq!(email, "Hidden");
            }
            if let Some(phone) = visitor["phone"].as_str() {
                assert_eq!(phone, "Hidden");
            }
            // company stays visible; only email/phone were revoked
        }
    }
    assert!(saw_contact, "expected at least one visitor with contact info");

    // the owner still sees real addresses
    let body = app
        .get(&format!("/api/v1/visitors/{}", owner_token))
        .send()
        .await
        .json()
        .await;
    assert!(body["visitors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["email"].as_str())
        .all(|email| email != "Hidden"));
}

#[tokio::test]
async fn pinned_interest_levels_narrow_the_listing() {
    let app = setup_test_app().await;
    let (client_id, owner_token) = create_paid_client(&app).await;

    DemoDataService::new(app.pool.clone())
        .generate_visitors(&client_id, 75)
        .await
        .unwrap();

    let created = app
        .post(&format!("/api/v1/users/{}", owner_token))
        .json(&json!({
            "name": "High Value Only",
            "email": "pinned@paid-business.example",
            "role": "viewer",
            "permissions": {"allowed_interest_levels": ["high"]}
        }))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let token = created.json().await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let body = app
        .get(&format!("/api/v1/visitors/{}", token))
        .send()
        .await
        .json()
        .await;
    let visitors = body["visitors"].as_array().unwrap();
    assert!(!visitors.is_empty());
    assert!(visitors
        .iter()
        .all(|v| v["interest_level"].as_str().unwrap() == "high"));
    let total = body["pagination"]["total_visitors"].as_i64().unwrap();
    assert!(total < 75);
}

#[tokio::test]
async fn csv_export_respects_export_permission() {
    let app = setup_test_app().await;
    let (client_id, owner_token) = create_paid_client(&app).await;

    DemoDataService::new(app.pool.clone())
        .generate_visitors(&client_id, 5)
        .await
        .unwrap();

    let export = app
        .get(&format!("/api/v1/visitors/{}/export", owner_token))
        .send()
        .await;
    assert_eq!(export.status(), StatusCode::OK);
    let csv = export.text().await;
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("visitor_id,name,email"));
    assert_eq!(lines.count(), 5);

    // viewers lack export_data by default
    let created = app
        .post(&format!("/api/v1/users/{}", owner_token))
        .json(&json!({
            "name": "Viewer",
            "email": "viewer@paid-business.example",
            "role": "viewer"
        }))
        .send()
        .await;
    let viewer_token = created.json().await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let denied = app
        .get(&format!("/api/v1/visitors/{}/export", viewer_token))
        .send()
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}
