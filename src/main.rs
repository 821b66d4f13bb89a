use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use storage_dashboard::{
    ApiClient, Config, DashboardController, Role, SessionContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let session = match SessionContext::restore(&config.session_file).await {
        Some(session) => session,
        None => {
            // No persisted session; fall back to a username from the
            // environment so the headless dashboard has someone to show.
            let username = std::env::var("DASHBOARD_USER")
                .context("No session on disk and DASHBOARD_USER is not set")?;
            let session = SessionContext::new(username, String::new(), Role::User);
            session.persist(&config.session_file).await?;
            session
        }
    };
    tracing::info!(username = %session.username, "session restored");

    let client = ApiClient::new(&config).context("Failed to build API client")?;
    let controller = Arc::new(Mutex::new(DashboardController::new(
        config, client, session,
    )));

    // Initial load, then background reconciliation on a fixed cadence.
    if let Err(err) = controller.lock().await.refresh().await {
        tracing::warn!(error = %err, "initial load failed");
    }
    let poll = DashboardController::start_polling(&controller).await;

    let mut snapshots = controller.lock().await.subscribe();
    let watcher = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snap = snapshots.borrow_and_update().clone();
            tracing::info!(
                used_mb = snap.quota.used_mb,
                total_mb = snap.quota.total_mb,
                percent = snap.quota.percentage(),
                files = snap.files.len(),
                level = ?snap.storage_level,
                "dashboard state"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    poll.cancel();
    watcher.abort();
    Ok(())
}
