//! Periodic deletion of expired sessions.
//!
//! The auth extractor already refuses expired tokens; this sweep keeps
//! the `sessions` table from accumulating dead rows. Runs on a fixed
//! interval until cancelled.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use mesa_db::repositories::SessionRepo;

/// Run the expired-session sweep loop until `cancel` is triggered.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Session sweep started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match SessionRepo::cleanup_expired(&pool).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Session sweep: purged expired sessions");
                    }
                    Ok(_) => {
                        tracing::debug!("Session sweep: nothing to purge");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Session sweep failed");
                    }
                }
            }
        }
    }
}
