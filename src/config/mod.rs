//! Configuration management for zapit
//!
//! The config file is optional. Values resolve as: CLI flag > environment
//! variable > config file > built-in default. The CLI layer applies the first
//! two on top of what `Config::load_at` returns.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default address of the ZAP API (ZAP's own default listener)
pub const DEFAULT_ZAP_URL: &str = "http://127.0.0.1:8080";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the ZAP API
    #[serde(default = "default_zap_url")]
    pub zap_url: String,

    /// ZAP API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Path to zap.sh, used by --start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zap_sh: Option<PathBuf>,

    /// Spider options passed to the scanner
    #[serde(default)]
    pub spider: SpiderOptions,

    /// Poll intervals, settle delays and timeouts
    #[serde(default)]
    pub timing: Timing,

    /// Report options
    #[serde(default)]
    pub report: ReportOptions,
}

fn default_zap_url() -> String {
    DEFAULT_ZAP_URL.to_string()
}

/// Spider options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiderOptions {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_thread_count")]
    pub thread_count: u32,
}

fn default_max_depth() -> u32 {
    10
}

fn default_thread_count() -> u32 {
    3
}

impl Default for SpiderOptions {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            thread_count: default_thread_count(),
        }
    }
}

/// Timing knobs, all in milliseconds.
///
/// Missing keys fall back to their defaults individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Pause after accessing the target
    pub access_settle_ms: u64,
    /// Pause between starting the spider and the first status query
    pub spider_start_delay_ms: u64,
    pub spider_poll_ms: u64,
    pub active_scan_poll_ms: u64,
    /// Pause after each completed phase
    pub settle_ms: u64,
    pub spider_timeout_ms: u64,
    pub active_scan_timeout_ms: u64,
    /// Interval between readiness probes after --start
    pub startup_probe_ms: u64,
    pub startup_timeout_ms: u64,
    /// How long to wait for a spawned scanner to exit after shutdown
    pub shutdown_grace_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            access_settle_ms: 2_000,
            spider_start_delay_ms: 2_000,
            spider_poll_ms: 2_000,
            active_scan_poll_ms: 5_000,
            settle_ms: 5_000,
            spider_timeout_ms: 60 * 60 * 1_000,
            active_scan_timeout_ms: 4 * 60 * 60 * 1_000,
            startup_probe_ms: 2_000,
            startup_timeout_ms: 120_000,
            shutdown_grace_ms: 30_000,
        }
    }
}

impl Timing {
    pub fn access_settle(&self) -> Duration {
        Duration::from_millis(self.access_settle_ms)
    }

    pub fn spider_start_delay(&self) -> Duration {
        Duration::from_millis(self.spider_start_delay_ms)
    }

    pub fn spider_poll(&self) -> Duration {
        Duration::from_millis(self.spider_poll_ms)
    }

    pub fn active_scan_poll(&self) -> Duration {
        Duration::from_millis(self.active_scan_poll_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn spider_timeout(&self) -> Duration {
        Duration::from_millis(self.spider_timeout_ms)
    }

    pub fn active_scan_timeout(&self) -> Duration {
        Duration::from_millis(self.active_scan_timeout_ms)
    }

    pub fn startup_probe(&self) -> Duration {
        Duration::from_millis(self.startup_probe_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Where the HTML report comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlSource {
    /// Render the bundled template locally
    #[default]
    Template,
    /// Ask ZAP for its own HTML report
    Scanner,
}

/// Report options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Directory holding report.html.j2, overriding the install directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,

    #[serde(default)]
    pub html_source: HtmlSource,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".zapit").join("config.yaml"))
    }

    /// Load configuration from an explicit path, or the default location.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(PathBuf::from(p)),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.zap_url.trim().is_empty() {
            return Err(ConfigError::Invalid("zap_url must not be empty".to_string()).into());
        }
        if self.spider.thread_count == 0 {
            return Err(
                ConfigError::Invalid("spider.thread_count must be at least 1".to_string()).into(),
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zap_url: default_zap_url(),
            api_key: None,
            zap_sh: None,
            spider: SpiderOptions::default(),
            timing: Timing::default(),
            report: ReportOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.zap_url, DEFAULT_ZAP_URL);
        assert!(config.api_key.is_none());
        assert!(config.zap_sh.is_none());
        assert_eq!(config.spider.max_depth, 10);
        assert_eq!(config.spider.thread_count, 3);
        assert_eq!(config.timing.spider_poll(), Duration::from_secs(2));
        assert_eq!(config.timing.active_scan_poll(), Duration::from_secs(5));
        assert_eq!(config.report.html_source, HtmlSource::Template);
    }

    #[test]
    fn test_partial_timing_keeps_other_defaults() {
        let yaml = "zap_url: http://zap:8090\ntiming:\n  spider_poll_ms: 10\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.zap_url, "http://zap:8090");
        assert_eq!(config.timing.spider_poll(), Duration::from_millis(10));
        assert_eq!(config.timing.active_scan_poll(), Duration::from_secs(5));
        assert_eq!(config.spider.max_depth, 10);
    }

    #[test]
    fn test_html_source_parses_lowercase() {
        let yaml = "report:\n  html_source: scanner\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.report.html_source, HtmlSource::Scanner);
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("absent.yaml");

        let err = Config::load_at(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "api_key: secret\nzap_sh: /opt/zap/zap.sh\nspider:\n  max_depth: 4\n",
        )
        .unwrap();

        let config = Config::load_from(path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.zap_sh, Some(PathBuf::from("/opt/zap/zap.sh")));
        assert_eq!(config.spider.max_depth, 4);
        assert_eq!(config.spider.thread_count, 3);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "spider:\n  thread_count: 0\n").unwrap();

        let err = Config::load_from(path).unwrap_err();
        assert!(err.to_string().contains("thread_count"));
    }
}
