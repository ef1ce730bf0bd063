//! ZAP process lifecycle
//!
//! `--start` launches `zap.sh -daemon` and waits until the API answers;
//! `--stop` asks the scanner to shut down at the end of the run.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Url;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::client::ScannerApi;
use crate::error::{ConfigError, Result, SupervisorError};
use crate::scan::poller::pause;

/// A scanner launched by this run
pub struct ScannerProcess {
    child: Child,
}

impl ScannerProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit status if the process already ended
    fn exited(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Kill a scanner that never became usable
    pub async fn kill(mut self) {
        if let Err(err) = self.child.kill().await {
            warn!("Failed to kill scanner: {}", err);
        }
    }
}

/// Arguments that make zap.sh listen where `zap_url` points
pub fn daemon_args(zap_url: &str, api_key: Option<&str>) -> Result<Vec<String>> {
    let url = Url::parse(zap_url)
        .map_err(|e| ConfigError::Invalid(format!("zap_url {:?}: {}", zap_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| ConfigError::Invalid(format!("zap_url {:?} has no host", zap_url)))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ConfigError::Invalid(format!("zap_url {:?} has no port", zap_url)))?;

    let mut args = vec![
        "-daemon".to_string(),
        "-host".to_string(),
        host.to_string(),
        "-port".to_string(),
        port.to_string(),
        "-config".to_string(),
    ];
    match api_key {
        Some(key) => args.push(format!("api.key={}", key)),
        None => args.push("api.disablekey=true".to_string()),
    }
    Ok(args)
}

/// Launch zap.sh in daemon mode
pub fn spawn(zap_sh: &Path, zap_url: &str, api_key: Option<&str>) -> Result<ScannerProcess> {
    let args = daemon_args(zap_url, api_key)?;
    info!("Starting {} -daemon", zap_sh.display());

    let mut command = Command::new(zap_sh);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = zap_sh.parent().filter(|d| !d.as_os_str().is_empty()) {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|source| SupervisorError::Spawn {
        path: zap_sh.to_path_buf(),
        source,
    })?;
    debug!("Scanner pid {:?}", child.id());

    Ok(ScannerProcess { child })
}

/// Probe the API until it answers, the process dies, or `timeout` passes.
///
/// Returns the scanner version.
pub async fn wait_until_ready<C: ScannerApi + ?Sized>(
    client: &C,
    zap_url: &str,
    mut process: Option<&mut ScannerProcess>,
    probe_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    let started = Instant::now();

    loop {
        match client.version().await {
            Ok(version) => {
                info!("ZAP {} ready after {:?}", version, started.elapsed());
                return Ok(version);
            }
            Err(err) => debug!("Scanner not ready yet: {}", err),
        }

        if let Some(process) = process.as_deref_mut() {
            if let Some(status) = process.exited()? {
                return Err(SupervisorError::Exited(status.to_string()).into());
            }
        }

        if started.elapsed() + probe_interval > timeout {
            return Err(SupervisorError::NotReady {
                url: zap_url.to_string(),
                timeout,
            }
            .into());
        }

        if !pause(probe_interval, cancel).await {
            return Err(SupervisorError::Cancelled.into());
        }
    }
}

/// Ask the scanner to shut down and reap the process if we started it.
///
/// Best effort: failures are logged. Returns whether the scanner accepted the
/// shutdown request.
pub async fn stop<C: ScannerApi + ?Sized>(
    client: &C,
    process: Option<ScannerProcess>,
    grace: Duration,
) -> bool {
    info!("Shutting down scanner");
    let accepted = match client.shutdown().await {
        Ok(()) => true,
        Err(err) => {
            warn!("Shutdown request failed: {}", err);
            false
        }
    };

    if let Some(mut process) = process {
        match tokio::time::timeout(grace, process.child.wait()).await {
            Ok(Ok(status)) => debug!("Scanner exited: {}", status),
            Ok(Err(err)) => warn!("Failed to wait for scanner: {}", err),
            Err(_) => {
                warn!("Scanner did not exit within {:?}; killing it", grace);
                if let Err(err) = process.child.kill().await {
                    warn!("Failed to kill scanner: {}", err);
                }
            }
        }
    }

    accepted
}
