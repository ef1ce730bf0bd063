//! Scan orchestration
//!
//! Drives one scan run against the scanner: access the target, reset alerts,
//! open a fresh session, run the requested phases and collect the results.

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::{Alert, ScannerApi};
use crate::config::{Config, Timing};
use crate::error::Result;

pub mod poller;

use poller::{PollOutcome, PollSettings, pause, poll_until_complete};

/// What to run against which target
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub target: String,
    pub spider: bool,
    pub active_scan: bool,
}

/// Scanner-side knobs for a run
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub max_depth: u32,
    pub thread_count: u32,
    pub timing: Timing,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.spider.max_depth,
            thread_count: config.spider.thread_count,
            timing: config.timing.clone(),
        }
    }
}

/// The two waiting phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Spider,
    ActiveScan,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Spider => write!(f, "Spider"),
            Phase::ActiveScan => write!(f, "Scan"),
        }
    }
}

/// Result of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Skipped,
    Completed,
    TimedOut { progress: u8 },
}

/// Everything collected from a run that reached the end
#[derive(Debug, Clone)]
pub struct ScanResults {
    pub hosts: Vec<String>,
    pub alerts: Vec<Alert>,
    pub spider: PhaseOutcome,
    pub active_scan: PhaseOutcome,
}

impl ScanResults {
    /// False when a phase gave up before reaching 100%
    pub fn is_complete(&self) -> bool {
        !matches!(self.spider, PhaseOutcome::TimedOut { .. })
            && !matches!(self.active_scan, PhaseOutcome::TimedOut { .. })
    }
}

/// How `run_scan` ended without a remote error
#[derive(Debug, Clone)]
pub enum ScanRun {
    Finished(ScanResults),
    Cancelled,
}

/// Receives progress from a running scan
pub trait ScanObserver: Send + Sync {
    fn target_accessed(&self, _target: &str) {}
    fn phase_started(&self, _phase: Phase, _target: &str) {}
    fn progress(&self, _phase: Phase, _percent: u8) {}
    fn phase_finished(&self, _phase: Phase, _outcome: PhaseOutcome) {}
}

/// Observer that ignores everything
#[cfg(test)]
pub struct SilentObserver;

#[cfg(test)]
impl ScanObserver for SilentObserver {}

/// Run the plan against the scanner.
///
/// Remote failures abort with an error and are not rolled back. A timed-out
/// phase skips the phases after it, but hosts and alerts are still collected.
pub async fn run_scan<C: ScannerApi + ?Sized>(
    client: &C,
    plan: &ScanPlan,
    settings: &ScanSettings,
    cancel: &CancellationToken,
    observer: &dyn ScanObserver,
) -> Result<ScanRun> {
    let target = plan.target.as_str();
    let timing = &settings.timing;

    info!("Accessing target {}", target);
    client.access_url(target).await?;
    observer.target_accessed(target);
    if !pause(timing.access_settle(), cancel).await {
        return Ok(ScanRun::Cancelled);
    }

    client.delete_all_alerts().await?;
    if cancel.is_cancelled() {
        return Ok(ScanRun::Cancelled);
    }
    client.new_session(target, true).await?;
    debug!("Opened session {}", target);

    let mut spider = PhaseOutcome::Skipped;
    let mut active_scan = PhaseOutcome::Skipped;

    if plan.spider {
        match run_spider(client, target, settings, cancel, observer).await? {
            Some(outcome) => spider = outcome,
            None => return Ok(ScanRun::Cancelled),
        }
        if !pause(timing.settle(), cancel).await {
            return Ok(ScanRun::Cancelled);
        }
    }

    if plan.active_scan {
        if let PhaseOutcome::TimedOut { progress } = spider {
            warn!(
                "Skipping active scan: spider timed out at {}%",
                progress
            );
        } else {
            match run_active_scan(client, target, settings, cancel, observer).await? {
                Some(outcome) => active_scan = outcome,
                None => return Ok(ScanRun::Cancelled),
            }
            if !pause(timing.settle(), cancel).await {
                return Ok(ScanRun::Cancelled);
            }
        }
    }

    if cancel.is_cancelled() {
        return Ok(ScanRun::Cancelled);
    }
    let hosts = client.hosts().await?;
    info!("Hosts: {}", hosts.join(", "));
    let alerts = client.alerts().await?;
    info!("Collected {} alerts", alerts.len());

    Ok(ScanRun::Finished(ScanResults {
        hosts,
        alerts,
        spider,
        active_scan,
    }))
}

/// Configure and run the spider. `None` means cancelled.
async fn run_spider<C: ScannerApi + ?Sized>(
    client: &C,
    target: &str,
    settings: &ScanSettings,
    cancel: &CancellationToken,
    observer: &dyn ScanObserver,
) -> Result<Option<PhaseOutcome>> {
    info!("Spidering target {}", target);
    observer.phase_started(Phase::Spider, target);

    client.spider_set_scope(target).await?;
    client.spider_set_max_depth(settings.max_depth).await?;
    client.spider_set_thread_count(settings.thread_count).await?;
    let scan_id = client.spider_scan(target).await?;
    debug!("Spider scan id {}", scan_id);

    // The status endpoint reports stale values right after start
    if !pause(settings.timing.spider_start_delay(), cancel).await {
        return Ok(None);
    }

    let scan_id = scan_id.as_str();
    let outcome = poll_until_complete(
        || client.spider_status(scan_id),
        PollSettings {
            interval: settings.timing.spider_poll(),
            timeout: settings.timing.spider_timeout(),
        },
        cancel,
        |percent| observer.progress(Phase::Spider, percent),
    )
    .await?;

    Ok(finish_phase(Phase::Spider, outcome, observer))
}

/// Start the active scan and wait for it. `None` means cancelled.
async fn run_active_scan<C: ScannerApi + ?Sized>(
    client: &C,
    target: &str,
    settings: &ScanSettings,
    cancel: &CancellationToken,
    observer: &dyn ScanObserver,
) -> Result<Option<PhaseOutcome>> {
    info!("Scanning target {}", target);
    observer.phase_started(Phase::ActiveScan, target);

    let scan_id = client.active_scan(target, true).await?;
    debug!("Active scan id {}", scan_id);

    let scan_id = scan_id.as_str();
    let outcome = poll_until_complete(
        || client.active_scan_status(scan_id),
        PollSettings {
            interval: settings.timing.active_scan_poll(),
            timeout: settings.timing.active_scan_timeout(),
        },
        cancel,
        |percent| observer.progress(Phase::ActiveScan, percent),
    )
    .await?;

    Ok(finish_phase(Phase::ActiveScan, outcome, observer))
}

fn finish_phase(
    phase: Phase,
    outcome: PollOutcome,
    observer: &dyn ScanObserver,
) -> Option<PhaseOutcome> {
    let outcome = match outcome {
        PollOutcome::Completed => PhaseOutcome::Completed,
        PollOutcome::TimedOut { progress } => {
            warn!("{} timed out at {}%", phase, progress);
            PhaseOutcome::TimedOut { progress }
        }
        PollOutcome::Cancelled => return None,
    };
    observer.phase_finished(phase, outcome);
    Some(outcome)
}
