/// Retention Sweeper
///
/// Scheduled reclamation of stale whitelist records.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::auth::refresh_token::RefreshStore;
use crate::error::{AppError, ConfigError};

/// Records older than this many days are deleted. Well past the refresh TTL,
/// so only abandoned or rotated-away leftovers are ever caught.
pub const DEFAULT_RETENTION_DAYS: i64 = 8;

const MIN_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn RefreshStore>,
    retention: Duration,
}

impl RetentionSweeper {
    /// # Errors
    /// Returns a config error unless `retention_days` is positive
    pub fn new(store: Arc<dyn RefreshStore>, retention_days: i64) -> Result<Self, AppError> {
        if retention_days <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "session.retention_days must be positive, got {}",
                retention_days
            ))
            .into());
        }

        Ok(Self {
            store,
            retention: Duration::days(retention_days),
        })
    }

    /// Delete every record created before `now - retention`
    pub async fn sweep(&self) -> Result<u64, AppError> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.store.delete_older_than(now - self.retention).await
    }

    /// Spawn a background task that sweeps once per `interval` (at least
    /// one second). Returns a handle that can be used to abort the task.
    pub fn spawn(self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let interval = interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(count) if count > 0 => info!("Swept {} stale refresh tokens", count),
                    Ok(_) => {}
                    Err(e) => error!("Failed to sweep refresh tokens: {}", e),
                }
            }
        })
    }
}
