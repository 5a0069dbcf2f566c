//! Matching service binary.
//!
//! Wires the store, the scoring clients, and the coordinator together
//! and serves the HTTP surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use match_client::ScoringClient;
use server::routes::{router, AppState};
use server::{MatchingCoordinator, ServerConfig};
use store::MatchStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!("Starting SupperMatch matching service");

    let store = Arc::new(MatchStore::new());
    store.set_restaurants(roster::catalog::default_catalog()).await;
    if config.seed_demo {
        let (slot_id, roster) = roster::demo::seed_demo(&store).await;
        info!(
            "Seeded demo slot {slot_id} with {} confirmed signups",
            roster.len()
        );
    }

    let scoring = ScoringClient::new(config.services.clone(), config.matching.request_timeout)
        .context("Failed to build scoring client")?;
    let coordinator = Arc::new(MatchingCoordinator::new(
        store.clone(),
        scoring,
        config.matching.clone(),
    ));

    let app = router(AppState { coordinator, store });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await.context("Server exited")?;

    Ok(())
}
