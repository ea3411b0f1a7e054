use dotenvy::dotenv;
use schooldesk::logging::{init_tracing, shutdown_tracer};
use schooldesk::metrics::{init_metrics, metrics_app};
use schooldesk::router::init_router;
use schooldesk::state::AppState;
use schooldesk_config::{LoggingConfig, ServerConfig};
use schooldesk_db::{init_db_pool, run_migrations};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();

    let logging_config = LoggingConfig::from_env();
    if let Err(e) = init_tracing(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped with an error");
        shutdown_tracer().await;
        std::process::exit(1);
    }

    shutdown_tracer().await;
}

async fn run() -> anyhow::Result<()> {
    let pool = init_db_pool().await?;
    run_migrations(&pool).await?;

    let state = AppState::from_pool(pool);
    let mut app = init_router(state);
    if let Some(handle) = init_metrics() {
        app = app.merge(metrics_app(handle));
    }

    let server_config = ServerConfig::from_env();
    let bind_address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("🚀 Server running on http://{}", bind_address);
    info!("📚 Swagger UI available at http://{}/swagger-ui", bind_address);
    info!("📖 Scalar UI available at http://{}/scalar", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
