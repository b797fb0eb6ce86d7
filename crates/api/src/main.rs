use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingochat_api::config::{ServerConfig, StoreBackend};
use lingochat_api::router::build_app_router;
use lingochat_api::service::ProgressService;
use lingochat_api::state::AppState;
use lingochat_store::memory::MemoryStore;
use lingochat_store::postgres::{self, PgStore};
use lingochat_store::ProgressStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingochat_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store: Arc<dyn ProgressStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; progress is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let database_url =
                std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for STORE=postgres");

            let pool = postgres::create_pool(&database_url).await?;
            tracing::info!("Database connection pool created");

            postgres::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Arc::new(PgStore::new(pool))
        }
    };

    let service = ProgressService::new(store);
    service.health_check().await?;
    tracing::info!("Store health check passed");

    // --- App state + router ---
    let state = AppState {
        service,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
