//! Account Count Background Job
//!
//! Periodically counts stored accounts and logs the result. Each probe runs
//! under its own deadline; a failed probe is logged and the next tick retries.
//! The loop stops as soon as its cancellation token fires, including while a
//! probe is still in flight.

use crate::context::OpContext;
use crate::services::AccountService;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Configuration for the account count probe
#[derive(Debug, Clone)]
pub struct AccountCountConfig {
    pub interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for AccountCountConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Run the probe loop until `cancel` fires
///
/// Returns the number of completed ticks, successful or not.
pub async fn run_account_count_probe(
    accounts: AccountService,
    config: AccountCountConfig,
    cancel: CancellationToken,
) -> u64 {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Starting account count background job"
    );

    let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let parent = OpContext::with_cancellation(cancel.clone());
    let mut ticks = 0u64;
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let ctx = parent.child_with_timeout(config.probe_timeout);
        match accounts.count(&ctx).await {
            Ok(count) => {
                if consecutive_failures > 0 {
                    tracing::info!(
                        previous_failures = consecutive_failures,
                        "Account count probe recovered"
                    );
                }
                consecutive_failures = 0;
                tracing::info!(account_count = count, "Account count probe");
            }
            Err(_) if cancel.is_cancelled() => break,
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(
                    consecutive_failures = consecutive_failures,
                    error = %e,
                    "Account count probe failed"
                );
            }
        }
        ticks += 1;
    }

    tracing::info!(ticks, "Account count background job stopped");
    ticks
}
