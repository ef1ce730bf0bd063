//! ZAP control API client

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

#[cfg(test)]
pub mod mock;
pub mod zap;

#[cfg(test)]
pub use mock::MockScannerClient;
pub use zap::ZapClient;

/// A single finding as reported by the scanner.
///
/// The field set belongs to ZAP (`alert`, `name`, `risk`, `url`, `param`, ...)
/// and is passed through without validation.
pub type Alert = BTreeMap<String, String>;

/// Report bodies the scanner can generate itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Xml,
}

impl ReportFormat {
    /// Name of the `OTHER/core/other/*` endpoint that produces this format
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReportFormat::Html => "htmlreport",
            ReportFormat::Xml => "xmlreport",
        }
    }
}

/// ZAP control API
///
/// One method per remote call the scan run needs. Every call carries the API
/// key when one is configured.
#[async_trait]
pub trait ScannerApi: Send + Sync {
    /// Scanner version; also used as the readiness probe
    async fn version(&self) -> Result<String>;

    /// Fetch a URL through the scanner so it enters the site tree
    async fn access_url(&self, url: &str) -> Result<()>;

    /// Drop every alert stored in the current session
    async fn delete_all_alerts(&self) -> Result<()>;

    /// Start a new named session
    async fn new_session(&self, name: &str, overwrite: bool) -> Result<()>;

    async fn spider_set_scope(&self, scope: &str) -> Result<()>;

    async fn spider_set_max_depth(&self, depth: u32) -> Result<()>;

    async fn spider_set_thread_count(&self, threads: u32) -> Result<()>;

    /// Start the spider, returning its scan id
    async fn spider_scan(&self, url: &str) -> Result<String>;

    /// Spider progress in percent (0-100)
    async fn spider_status(&self, scan_id: &str) -> Result<u8>;

    /// Start an active scan, returning its scan id
    async fn active_scan(&self, url: &str, recurse: bool) -> Result<String>;

    /// Active scan progress in percent (0-100)
    async fn active_scan_status(&self, scan_id: &str) -> Result<u8>;

    /// Hosts seen by the scanner so far
    async fn hosts(&self) -> Result<Vec<String>>;

    /// Every alert in the current session, in scanner order
    async fn alerts(&self) -> Result<Vec<Alert>>;

    /// Report body generated by the scanner
    async fn report(&self, format: ReportFormat) -> Result<Vec<u8>>;

    /// Ask the scanner process to exit
    async fn shutdown(&self) -> Result<()>;
}

/// Parse a ZAP progress value ("42") into a percentage capped at 100
pub fn parse_progress(raw: &str) -> std::result::Result<u8, ApiError> {
    raw.trim()
        .parse::<u32>()
        .map(|pct| pct.min(100) as u8)
        .map_err(|_| ApiError::InvalidResponse(format!("Invalid progress value: {:?}", raw)))
}
