//! Fixed-interval progress polling
//!
//! Both scan phases wait the same way: ask the scanner for a percentage,
//! report it, sleep, repeat until 100. The loop is bounded by a timeout and
//! stops early when the run is cancelled.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Poll cadence and upper bound for one phase
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

/// How a polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The counter reached 100
    Completed,
    /// The timeout elapsed first; `progress` is the last reading
    TimedOut { progress: u8 },
    Cancelled,
}

/// Query `status` until it reports 100.
///
/// `on_progress` sees every reading, including the final one. Consecutive
/// queries are at least `interval` apart. A query error ends the loop.
pub async fn poll_until_complete<Q, Fut, P>(
    mut status: Q,
    settings: PollSettings,
    cancel: &CancellationToken,
    mut on_progress: P,
) -> Result<PollOutcome>
where
    Q: FnMut() -> Fut,
    Fut: Future<Output = Result<u8>>,
    P: FnMut(u8),
{
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return Ok(PollOutcome::Cancelled);
        }

        let progress = status().await?;
        on_progress(progress);

        if progress >= 100 {
            return Ok(PollOutcome::Completed);
        }

        if started.elapsed() + settings.interval > settings.timeout {
            return Ok(PollOutcome::TimedOut { progress });
        }

        if !pause(settings.interval, cancel).await {
            return Ok(PollOutcome::Cancelled);
        }
    }
}

/// Sleep for `duration`; returns false if cancelled first
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
