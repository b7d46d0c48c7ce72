use chat_relay::{AppState, config::Config, cors_layer, create_router, repositories::MemoryStore};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    config.print_info();

    let state = match config.database_url.as_deref() {
        Some(url) => {
            // pool a dimensione fissa: una richiesta in eccesso attende o fallisce con 503
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect(url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations applied");

            AppState::new(pool, config.jwt_secret.clone())
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            AppState::in_memory(Arc::new(MemoryStore::new()), config.jwt_secret.clone())
        }
    };
    let state = Arc::new(state.with_config(&config));

    let app = create_router(state).layer(cors_layer(config.cors_origins.as_deref()));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
