//! SportsHub
//!
//! Main application entry point

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, error};

use SportsHub::{
    config::Settings,
    utils::logging,
    database::{DatabaseService, DatabaseConfig, create_pool, run_migrations},
    services::ServiceFactory,
    state::AppState,
    handlers,
};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", SportsHub::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&DatabaseConfig::from(&settings.database)).await?;

    // Run database migrations
    info!("Running database migrations...");
    run_migrations(&db_pool).await?;

    let database_service = DatabaseService::new(db_pool);

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, database_service)?;

    match services.users.bootstrap_admin(&settings.bootstrap).await {
        Ok(Some(admin)) => info!(user_id = admin.id, username = %admin.username, "Bootstrap admin created"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Bootstrap admin was not created"),
    }

    services.wordcloud.warm().await;
    let _wordcloud_task = services.wordcloud.start();

    let bind_address = settings.bind_address();
    let state = AppState::new(settings, services);

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });

    let app = handlers::router(state);

    let listener = TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "SportsHub is listening");

    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("SportsHub has been shut down.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
