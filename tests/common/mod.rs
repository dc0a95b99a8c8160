// Shared test harness: a router wired to a throwaway SQLite database.
//
// Each TestApp owns a tempdir-backed database file (a shared `:memory:`
// database does not survive bb8 handing out separate connections) and a
// fixed-answer geo provider so access checks are deterministic.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

use leadsight_backend::{
    app::AppState,
    db::{create_db_pool, DatabaseConfig, DbPool},
    migrations::run_migrations,
    services::geo::{GeoInfo, StaticGeoProvider},
    services::payment::PaymentService,
};

pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    pub state: AppState,
    _db_dir: TempDir,
}

impl TestApp {
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }
}

pub struct TestRequest<'a> {
    app: &'a TestApp,
    request: Request<Body>,
    peer_ip: String,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        Self {
            app,
            request,
            peer_ip: "127.0.0.1".to_string(),
        }
    }

    pub fn json<T: serde::Serialize>(mut self, body: &T) -> Self {
        let bytes = serde_json::to_vec(body).unwrap();
        self.request = Request::builder()
            .method(self.request.method().clone())
            .uri(self.request.uri().clone())
            .header("content-type", "application/json")
            .body(Body::from(bytes))
            .unwrap();
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.peer_ip = ip.to_string();
        self
    }

    pub async fn send(self) -> TestResponse {
        let mut request = self.request;
        let peer: SocketAddr = format!("{}:40000", self.peer_ip).parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = self.app.app.clone().oneshot(request).await.unwrap();
        TestResponse { response }
    }
}

pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub async fn json(self) -> serde_json::Value {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

/// App over a fresh database with the given geo answer (defaults to US,
/// not a proxy).
pub async fn setup_test_app_with_geo(geo: GeoInfo) -> TestApp {
    let db_dir = TempDir::new().expect("tempdir");
    let db_path = db_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .into_owned();

    run_migrations(&db_path).await.expect("migrations");

    let pool = create_db_pool(DatabaseConfig {
        url: db_path,
        max_connections: 2,
        connection_timeout: Duration::from_secs(5),
    })
    .await
    .expect("pool");

    PaymentService::new(pool.clone())
        .seed_plans()
        .await
        .expect("seed plans");

    let config = leadsight_backend::app_config::config();
    let state = AppState::with_geo(pool.clone(), config, Arc::new(StaticGeoProvider { info: geo }));

    TestApp {
        app: leadsight_backend::create_router(state.clone()),
        pool,
        state,
        _db_dir: db_dir,
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_geo(GeoInfo {
        country_code: "US".to_string(),
        is_proxy: false,
    })
    .await
}

/// Create a trial through the API and return (client_id, access_token)
pub async fn create_trial(app: &TestApp, hours: i64) -> (String, String) {
    let response = app
        .post("/api/v1/trials")
        .json(&serde_json::json!({
            "business_name": "Test Business",
            "contact_email": "owner@test-business.example",
            "website_url": "https://test-business.example",
            "duration_hours": hours
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
