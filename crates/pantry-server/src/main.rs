use anyhow::{Context, Result};
use pantry_db::{create_pool, run_migrations};
use pantry_server::accounts::seed_initial_superuser;
use pantry_server::config::load_config;
use pantry_server::state::AppState;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Pantry server");

    // Load configuration
    let config_path =
        std::env::var("PANTRY_CONFIG").unwrap_or_else(|_| "server-config.yaml".to_string());

    tracing::info!("Loading config from: {}", config_path);
    let config = load_config(&config_path)?;
    tracing::info!("Config loaded successfully");

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.db.url, config.db.max_connections)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Seed initial superuser if configured
    if let Some(initial) = &config.auth.initial_superuser {
        if let Err(e) = seed_initial_superuser(&pool, initial).await {
            tracing::warn!("Failed to seed initial superuser: {:#}", e);
        }
    }

    tokio::fs::create_dir_all(&config.media.root_dir)
        .await
        .with_context(|| format!("Failed to create media root: {}", config.media.root_dir))?;

    let listen = config.listen.clone();
    let state = AppState::new(pool, config);

    // Start background tasks
    let cancel_token = CancellationToken::new();
    let sweeper = pantry_server::sweeper::start(state.clone(), cancel_token.clone());

    // Build router
    let app = pantry_server::web::build_router(state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind to {}", listen))?;

    tracing::info!("Server listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await
        .context("Server error")?;

    if let Err(e) = sweeper.await {
        tracing::warn!("Token sweeper ended abnormally: {}", e);
    }

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
    cancel_token.cancel();
}
