//! Structured result of one run

use std::path::PathBuf;

use serde::Serialize;

use crate::client::Alert;
use crate::report::{ReportKind, RiskCount, count_by_risk};
use crate::scan::{PhaseOutcome, ScanResults, ScanRun};

/// How the scan part of the run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    /// Every requested phase reached 100%
    Completed,
    /// A phase timed out; results are partial
    Incomplete,
    Cancelled,
    /// A remote call failed
    Failed { message: String },
}

/// How the report step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Saved { path: PathBuf, kind: ReportKind },
    Failed { path: PathBuf, message: String },
}

/// Scan, report and shutdown results of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub target: String,
    pub scan: ScanStatus,
    pub spider: PhaseOutcome,
    pub active_scan: PhaseOutcome,
    pub hosts: Vec<String>,
    pub risk_summary: Vec<RiskCount>,
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportOutcome>,
    /// Set when --stop was requested: whether the scanner accepted shutdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner_stopped: Option<bool>,
}

impl RunOutcome {
    /// Outcome of a scan that ended without a remote error
    pub fn from_run(target: &str, run: ScanRun) -> Self {
        match run {
            ScanRun::Finished(results) => Self::from_results(target, results),
            ScanRun::Cancelled => Self::empty(target, ScanStatus::Cancelled),
        }
    }

    /// Outcome of a scan aborted by a remote failure
    pub fn failed(target: &str, message: impl Into<String>) -> Self {
        Self::empty(
            target,
            ScanStatus::Failed {
                message: message.into(),
            },
        )
    }

    fn from_results(target: &str, results: ScanResults) -> Self {
        let scan = if results.is_complete() {
            ScanStatus::Completed
        } else {
            ScanStatus::Incomplete
        };

        Self {
            target: target.to_string(),
            scan,
            spider: results.spider,
            active_scan: results.active_scan,
            risk_summary: count_by_risk(&results.alerts),
            hosts: results.hosts,
            alerts: results.alerts,
            report: None,
            scanner_stopped: None,
        }
    }

    fn empty(target: &str, scan: ScanStatus) -> Self {
        Self {
            target: target.to_string(),
            scan,
            spider: PhaseOutcome::Skipped,
            active_scan: PhaseOutcome::Skipped,
            hosts: Vec::new(),
            risk_summary: Vec::new(),
            alerts: Vec::new(),
            report: None,
            scanner_stopped: None,
        }
    }

    /// True when there are alerts worth reporting
    pub fn has_results(&self) -> bool {
        matches!(self.scan, ScanStatus::Completed | ScanStatus::Incomplete)
    }
}
