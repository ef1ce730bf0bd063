//! Mock ZAP client for testing
//!
//! Provides a scripted implementation of `ScannerApi` for unit testing
//! without a running scanner.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Alert, ReportFormat, ScannerApi};
use crate::error::{ApiError, Result};

/// Mock scanner client.
///
/// Configure responses via builder methods, run the code under test, then
/// inspect `calls()` for the order of remote calls.
///
/// # Example
/// ```ignore
/// let mock = MockScannerClient::new()
///     .with_spider_progress(vec![10, 60, 100])
///     .with_alerts(vec![alert(&[("name", "XSS")])]);
/// ```
#[derive(Clone)]
pub struct MockScannerClient {
    /// Progress values returned by successive spider_status calls
    spider_progress: Arc<Mutex<VecDeque<u8>>>,
    /// Progress values returned by successive active_scan_status calls
    active_progress: Arc<Mutex<VecDeque<u8>>>,
    hosts: Arc<Mutex<Vec<String>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
    report_body: Arc<Mutex<Vec<u8>>>,
    version: Arc<Mutex<String>>,
    /// Number of version calls that fail before the scanner counts as up
    unready_probes: Arc<Mutex<usize>>,
    /// Call name that fails with the stored error
    fail_on: Arc<Mutex<Option<(&'static str, ApiError)>>>,
    /// Recorded calls, in order, as "name" or "name arg"
    calls: Arc<Mutex<Vec<String>>>,
    /// When each status query happened
    status_times: Arc<Mutex<Vec<Instant>>>,
}

impl Default for MockScannerClient {
    fn default() -> Self {
        Self {
            spider_progress: Arc::new(Mutex::new(VecDeque::new())),
            active_progress: Arc::new(Mutex::new(VecDeque::new())),
            hosts: Arc::new(Mutex::new(Vec::new())),
            alerts: Arc::new(Mutex::new(Vec::new())),
            report_body: Arc::new(Mutex::new(Vec::new())),
            version: Arc::new(Mutex::new("2.14.0".to_string())),
            unready_probes: Arc::new(Mutex::new(0)),
            fail_on: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            status_times: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockScannerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spider status sequence; the last value repeats once exhausted
    pub fn with_spider_progress(self, progress: Vec<u8>) -> Self {
        *self.spider_progress.try_lock().expect("unshared") = progress.into();
        self
    }

    /// Active scan status sequence; the last value repeats once exhausted
    pub fn with_active_progress(self, progress: Vec<u8>) -> Self {
        *self.active_progress.try_lock().expect("unshared") = progress.into();
        self
    }

    pub fn with_hosts(self, hosts: Vec<&str>) -> Self {
        *self.hosts.try_lock().expect("unshared") = hosts.into_iter().map(String::from).collect();
        self
    }

    pub fn with_alerts(self, alerts: Vec<Alert>) -> Self {
        *self.alerts.try_lock().expect("unshared") = alerts;
        self
    }

    pub fn with_report(self, body: &[u8]) -> Self {
        *self.report_body.try_lock().expect("unshared") = body.to_vec();
        self
    }

    /// Fail the first `n` version probes with a network error
    pub fn with_unready_probes(self, n: usize) -> Self {
        *self.unready_probes.try_lock().expect("unshared") = n;
        self
    }

    /// Make the named call fail with `error`
    pub fn with_error_on(self, call: &'static str, error: ApiError) -> Self {
        *self.fail_on.try_lock().expect("unshared") = Some((call, error));
        self
    }

    /// Calls made so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Names of the calls made so far, without arguments
    pub async fn call_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    /// Timestamps of every status query
    pub async fn status_times(&self) -> Vec<Instant> {
        self.status_times.lock().await.clone()
    }

    async fn record(&self, call: &'static str, arg: Option<String>) -> Result<()> {
        let entry = match arg {
            Some(arg) => format!("{} {}", call, arg),
            None => call.to_string(),
        };
        self.calls.lock().await.push(entry);

        let mut fail_on = self.fail_on.lock().await;
        if matches!(*fail_on, Some((name, _)) if name == call) {
            if let Some((_, err)) = fail_on.take() {
                return Err(err.into());
            }
        }
        Ok(())
    }

    async fn next_progress(&self, queue: &Mutex<VecDeque<u8>>) -> u8 {
        self.status_times.lock().await.push(Instant::now());
        let mut queue = queue.lock().await;
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(100)
        } else {
            queue.front().copied().unwrap_or(100)
        }
    }
}

#[async_trait]
impl ScannerApi for MockScannerClient {
    async fn version(&self) -> Result<String> {
        self.record("version", None).await?;
        let mut unready = self.unready_probes.lock().await;
        if *unready > 0 {
            *unready -= 1;
            return Err(ApiError::Network("Failed to connect to the scanner API".to_string()).into());
        }
        Ok(self.version.lock().await.clone())
    }

    async fn access_url(&self, url: &str) -> Result<()> {
        self.record("access_url", Some(url.to_string())).await
    }

    async fn delete_all_alerts(&self) -> Result<()> {
        self.record("delete_all_alerts", None).await
    }

    async fn new_session(&self, name: &str, overwrite: bool) -> Result<()> {
        self.record("new_session", Some(format!("{} {}", name, overwrite)))
            .await
    }

    async fn spider_set_scope(&self, scope: &str) -> Result<()> {
        self.record("spider_set_scope", Some(scope.to_string()))
            .await
    }

    async fn spider_set_max_depth(&self, depth: u32) -> Result<()> {
        self.record("spider_set_max_depth", Some(depth.to_string()))
            .await
    }

    async fn spider_set_thread_count(&self, threads: u32) -> Result<()> {
        self.record("spider_set_thread_count", Some(threads.to_string()))
            .await
    }

    async fn spider_scan(&self, url: &str) -> Result<String> {
        self.record("spider_scan", Some(url.to_string())).await?;
        Ok("1".to_string())
    }

    async fn spider_status(&self, scan_id: &str) -> Result<u8> {
        self.record("spider_status", Some(scan_id.to_string()))
            .await?;
        Ok(self.next_progress(&self.spider_progress).await)
    }

    async fn active_scan(&self, url: &str, recurse: bool) -> Result<String> {
        self.record("active_scan", Some(format!("{} {}", url, recurse)))
            .await?;
        Ok("2".to_string())
    }

    async fn active_scan_status(&self, scan_id: &str) -> Result<u8> {
        self.record("active_scan_status", Some(scan_id.to_string()))
            .await?;
        Ok(self.next_progress(&self.active_progress).await)
    }

    async fn hosts(&self) -> Result<Vec<String>> {
        self.record("hosts", None).await?;
        Ok(self.hosts.lock().await.clone())
    }

    async fn alerts(&self) -> Result<Vec<Alert>> {
        self.record("alerts", None).await?;
        Ok(self.alerts.lock().await.clone())
    }

    async fn report(&self, format: ReportFormat) -> Result<Vec<u8>> {
        self.record("report", Some(format.endpoint().to_string()))
            .await?;
        Ok(self.report_body.lock().await.clone())
    }

    async fn shutdown(&self) -> Result<()> {
        self.record("shutdown", None).await
    }
}

/// Build an alert from field pairs
pub fn alert(fields: &[(&str, &str)]) -> Alert {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_sequence_repeats_last_value() {
        let mock = MockScannerClient::new().with_spider_progress(vec![10, 100]);

        assert_eq!(mock.spider_status("1").await.unwrap(), 10);
        assert_eq!(mock.spider_status("1").await.unwrap(), 100);
        assert_eq!(mock.spider_status("1").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_error_is_consumed_once() {
        let mock = MockScannerClient::new()
            .with_error_on("hosts", ApiError::ServerError("boom".to_string()));

        assert!(mock.hosts().await.is_err());
        assert!(mock.hosts().await.is_ok());
        assert_eq!(mock.call_names().await, vec!["hosts", "hosts"]);
    }

    #[tokio::test]
    async fn test_unready_probes() {
        let mock = MockScannerClient::new().with_unready_probes(2);

        assert!(mock.version().await.is_err());
        assert!(mock.version().await.is_err());
        assert_eq!(mock.version().await.unwrap(), "2.14.0");
    }
}
