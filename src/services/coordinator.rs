//! Background update coordinator.
//!
//! Refreshes the shared client on a fixed interval. Each cycle:
//! - fetches and parses under a read lock, so API readers are never blocked
//!   on the network,
//! - applies the resulting snapshot under a short write lock.
//!
//! The whole cycle runs inside a timeout. Failures and timeouts are logged
//! and retried on the next tick; previously applied data stays available.
//! Only this task calls `fetch_update`, so at most one update is in flight.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::services::client::GismeteoClient;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default refresh cadence (seconds).
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 5 * 60;

/// Wall-clock limit for one update cycle (seconds).
pub const UPDATE_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Coordinator state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Coordinator status, exposed via the status endpoint.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CoordinatorState {
    pub last_update_success: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub total_updates: u64,
    pub last_error: Option<String>,
    pub next_update_at: Option<DateTime<Utc>>,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_update_success = true;
        self.last_updated_at = Some(at);
        self.consecutive_failures = 0;
        self.total_updates += 1;
        self.last_error = None;
    }

    fn record_failure(&mut self, error: String) {
        self.last_update_success = false;
        self.consecutive_failures += 1;
        self.total_updates += 1;
        self.last_error = Some(error);
    }
}

/// Shared client handle.
pub type SharedClient = Arc<RwLock<GismeteoClient>>;

/// Shared coordinator state handle.
pub type SharedCoordinatorState = Arc<RwLock<CoordinatorState>>;

// ---------------------------------------------------------------------------
// Update cycle
// ---------------------------------------------------------------------------

/// Run one update cycle and record its outcome. Returns whether it succeeded.
pub async fn refresh_once(
    client: &SharedClient,
    state: &SharedCoordinatorState,
    timeout: std::time::Duration,
) -> bool {
    let started = Utc::now();

    let result = tokio::time::timeout(timeout, async {
        let snapshot = client.read().await.fetch_update(started.timestamp()).await?;
        client.write().await.apply(snapshot);
        Ok::<(), crate::errors::ApiError>(())
    })
    .await;

    let mut s = state.write().await;
    match result {
        Ok(Ok(())) => {
            tracing::debug!(
                "Coordinator: update finished in {} ms",
                (Utc::now() - started).num_milliseconds()
            );
            s.record_success(started);
            true
        }
        Ok(Err(e)) => {
            tracing::error!("Coordinator: update failed: {}", e);
            s.record_failure(e.to_string());
            false
        }
        Err(_) => {
            tracing::error!(
                "Coordinator: update timed out after {} seconds",
                timeout.as_secs()
            );
            s.record_failure(format!("timed out after {} seconds", timeout.as_secs()));
            false
        }
    }
}

/// Run the coordinator. This function never returns (runs until process exit).
///
/// Should be spawned via `tokio::spawn(run_coordinator(...))`.
pub async fn run_coordinator(
    client: SharedClient,
    state: SharedCoordinatorState,
    interval_secs: u64,
) {
    tracing::info!(
        "Update coordinator started, refreshing every {} seconds",
        interval_secs
    );

    let period = std::time::Duration::from_secs(interval_secs.max(1));
    let timeout = std::time::Duration::from_secs(UPDATE_TIMEOUT_SECS);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        refresh_once(&client, &state, timeout).await;

        let mut s = state.write().await;
        s.next_update_at = Some(Utc::now() + Duration::seconds(interval_secs as i64));
    }
}
