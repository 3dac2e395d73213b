//! Background sweeps.
//!
//! Two periodic tasks run alongside the HTTP server:
//!
//! - the escrow release sweep pays out holds whose release date has
//!   arrived, claiming each row with a non-blocking try-lock so concurrent
//!   sweep workers skip rows instead of contending or double-processing;
//! - the slot refresh sweep re-materializes capacity for every published
//!   facility, which also auto-extends expired template windows.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;

use venuepass_store::lock_keys;

use crate::handlers::{escrows, slots};
use crate::state::AppState;

/// Maximum escrows claimed per sweep pass.
const RELEASE_BATCH_LIMIT: usize = 100;

/// Outcome of one escrow release pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Escrows released.
    pub released: usize,
    /// Rows skipped (claimed elsewhere, paused, or disputed).
    pub skipped: usize,
    /// Rows that failed with an unexpected error.
    pub failed: usize,
}

/// Spawn both sweeps.
pub fn spawn(state: Arc<AppState>) {
    let release_state = Arc::clone(&state);
    let release_interval = state.config.escrow_sweep_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(release_interval));
        loop {
            interval.tick().await;
            let stats = run_escrow_release_once(&release_state).await;
            if stats != SweepStats::default() {
                tracing::info!(
                    released = %stats.released,
                    skipped = %stats.skipped,
                    failed = %stats.failed,
                    "Escrow release sweep completed"
                );
            }
        }
    });

    let refresh_interval = state.config.slot_refresh_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(refresh_interval));
        loop {
            interval.tick().await;
            run_slot_refresh_once(&state).await;
        }
    });
}

/// One pass of the escrow release sweep.
///
/// Scans the release queue for holds due today or earlier and releases
/// each one it can claim. Rows already locked by another worker (or a
/// concurrent sweep) are skipped, never waited on; rows that fail the
/// release guards (paused, disputed) are skipped too and picked up again
/// once eligible.
pub async fn run_escrow_release_once(state: &AppState) -> SweepStats {
    let mut stats = SweepStats::default();

    let today = Utc::now().date_naive();
    let due = match state.store.due_escrows(today, RELEASE_BATCH_LIMIT) {
        Ok(due) => due,
        Err(e) => {
            tracing::error!(error = %e, "Release queue scan failed");
            stats.failed += 1;
            return stats;
        }
    };

    for escrow_id in due {
        let Some(_guard) = state.locks.try_acquire(vec![lock_keys::escrow(escrow_id)]) else {
            stats.skipped += 1;
            continue;
        };

        match escrows::release_claimed(state, escrow_id) {
            Ok(release) => {
                stats.released += 1;
                tracing::info!(
                    escrow_id = %escrow_id,
                    payout_amount = %release.payout_amount,
                    "Escrow auto-released"
                );
            }
            Err(crate::error::ApiError::Conflict(_) | crate::error::ApiError::Forbidden(_)) => {
                // Paused, disputed, or already settled; eligible rows come
                // back on a later pass.
                stats.skipped += 1;
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(escrow_id = %escrow_id, error = %e, "Escrow auto-release failed");
            }
        }
    }

    stats
}

/// One pass of the slot refresh sweep.
pub async fn run_slot_refresh_once(state: &AppState) {
    let facilities = match state.store.list_facilities() {
        Ok(facilities) => facilities,
        Err(e) => {
            tracing::error!(error = %e, "Facility scan failed");
            return;
        }
    };

    for facility in facilities.iter().filter(|f| f.is_bookable()) {
        match slots::regenerate_for_facility(state, facility.id).await {
            Ok(generated) if generated > 0 => {
                tracing::info!(
                    facility_id = %facility.id,
                    generated = %generated,
                    "Slot refresh materialized capacity"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(facility_id = %facility.id, error = %e, "Slot refresh failed");
            }
        }
    }
}
