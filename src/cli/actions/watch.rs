use crate::pcdt::{
    detect::{DetectionConfig, Detector},
    storage,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Handle the watch action: the detection scheduler.
///
/// Sweeps run from this single task, one at a time, so the detector's
/// cooldown state is never mutated concurrently.
/// # Errors
/// Returns an error if the store becomes unreachable.
pub async fn execute(dsn: &str, interval_secs: u64) -> Result<()> {
    let pool = storage::connect(dsn).await?;
    let mut detector = Detector::new(DetectionConfig::default());

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("watching login attempts every {interval_secs}s");
    loop {
        ticker.tick().await;
        detector
            .sweep(&pool)
            .await
            .context("detection sweep failed")?;
    }
}
