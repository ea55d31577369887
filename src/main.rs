use std::sync::Arc;

use mahjong_ledger::{
    router, AppState, InMemoryLedgerRepository, LedgerConfig, LedgerRepository, LedgerService,
    PostgresLedgerRepository,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mahjong_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mahjong ledger server");

    let config = LedgerConfig::from_env();
    info!(
        stats_mode = %config.ledger.stats_mode,
        leaderboard_size = config.ledger.leaderboard_size,
        max_rounds = config.ledger.max_rounds,
        "Loaded configuration"
    );

    let repository: Arc<dyn LedgerRepository> = match &config.database_url {
        Some(database_url) => {
            let pool = match sqlx::PgPool::connect(database_url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    std::process::exit(1);
                }
            };
            let repository = PostgresLedgerRepository::new(pool);
            if let Err(e) = repository.migrate().await {
                error!(error = %e, "Failed to run database migrations");
                std::process::exit(1);
            }
            info!("Using PostgreSQL ledger store");
            Arc::new(repository)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory ledger store");
            Arc::new(InMemoryLedgerRepository::new())
        }
    };

    let ledger = Arc::new(LedgerService::new(repository, config.ledger));
    let app = router(AppState::new(ledger))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind_addr = %config.bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!("Server running on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
    }
}
