//! TTL sweeper — periodic deletion of expired memories.
//!
//! A memory expires when `created_at + ttl_days * 1 day < now()`. Expired
//! rows stay queryable until a sweep deletes them. One sweeper runs per
//! process: starting a second is a no-op. The task sweeps once at startup,
//! then on every tick, and stops within the current tick on shutdown.

use crate::db::Db;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

static SWEEPER_RUNNING: AtomicBool = AtomicBool::new(false);

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal shutdown and wait for the task to finish its current tick.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
        info!("sweeper stopped");
    }
}

/// Start the background sweeper. Returns `None` when one is already running
/// in this process.
pub fn start(db: Arc<Db>, interval: Duration) -> Option<SweeperHandle> {
    if SWEEPER_RUNNING.swap(true, Ordering::SeqCst) {
        info!("sweeper already running");
        return None;
    }

    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "sweeper started");
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately, giving the startup sweep.
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => run_sweep(&db).await,
            }
        }
        SWEEPER_RUNNING.store(false, Ordering::SeqCst);
    });

    Some(SweeperHandle { shutdown, handle })
}

/// One sweep. Failures are logged; the loop keeps running.
async fn run_sweep(db: &Db) {
    match delete_expired(db).await {
        Ok(0) => debug!("sweep found no expired memories"),
        Ok(deleted) => info!(deleted, "swept expired memories"),
        Err(e) => error!(error = %e, "sweep failed"),
    }
}

/// Delete every expired memory in the partition. Idempotent: a second run
/// on the same state deletes nothing.
pub async fn delete_expired(db: &Db) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM memories \
         WHERE tenant_id = $1 \
           AND workspace_id = $2 \
           AND ttl_days IS NOT NULL \
           AND created_at + ttl_days * INTERVAL '1 day' < NOW()",
    )
    .bind(db.tenant_id())
    .bind(db.workspace_id())
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected())
}
