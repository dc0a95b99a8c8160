use std::net::SocketAddr;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadsight_backend::{
    create_router, initialize_app_state,
    services::{background_tasks::initialize_background_tasks, payment::PaymentService},
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadsight_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();

    let state = match initialize_app_state().await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("initialization failed: {}", e),
            ));
        }
    };

    if let Err(e) = PaymentService::new(state.pool.clone()).seed_plans().await {
        error!("Failed to seed payment plans: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("plan seeding failed: {}", e),
        ));
    }

    initialize_background_tasks(state.clone());

    let addr = state.config.server_addr();
    let app = create_router(state);

    info!("Starting visitor investigation backend on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
