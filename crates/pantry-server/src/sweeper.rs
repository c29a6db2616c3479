use crate::state::AppState;
use anyhow::Result;
use pantry_db::AuthTokenRepo;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the token sweeper background task.
///
/// Periodically deletes auth tokens whose expiry has passed. Expired tokens
/// are already refused at authentication time; this only keeps the table
/// from growing.
pub fn start(state: AppState, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_loop(state, cancel).await;
    })
}

async fn run_loop(state: AppState, cancel: CancellationToken) {
    let interval = Duration::from_secs(state.config.auth.sweep_interval_secs.max(1));
    tracing::info!("Token sweeper started (interval={:?})", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {},
            _ = cancel.cancelled() => {
                tracing::info!("Token sweeper shutting down");
                return;
            }
        }

        if let Err(e) = sweep(&state).await {
            tracing::error!("Token sweep error: {:#}", e);
        }
    }
}

/// Run a single sweep. Exposed for integration tests.
pub async fn sweep_once(state: &AppState) -> Result<u64> {
    sweep(state).await
}

async fn sweep(state: &AppState) -> Result<u64> {
    let removed = AuthTokenRepo::delete_expired(&state.pool).await?;
    if removed > 0 {
        tracing::info!("Removed {} expired auth token(s)", removed);
    }
    Ok(removed)
}
