//! Run context
//!
//! Resolves CLI flags and the config file into everything one run needs, so
//! the handler does not thread a dozen parameters around.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{Cli, OutputFormat};
use crate::client::ZapClient;
use crate::config::{Config, HtmlSource};
use crate::error::{ConfigError, Result};
use crate::report::ReportFile;
use crate::scan::{ScanPlan, ScanSettings};

/// Context for one scan run containing config, client and resolved options.
pub struct RunContext {
    /// Config with CLI and environment overrides applied
    pub config: Config,
    pub client: Arc<ZapClient>,
    pub plan: ScanPlan,
    pub settings: ScanSettings,
    pub report: Option<ReportFile>,
    pub force: bool,
    /// zap.sh to launch; set only with --start
    pub start: Option<PathBuf>,
    pub stop: bool,
    pub format: OutputFormat,
}

impl RunContext {
    /// Build the context from parsed arguments.
    ///
    /// # Errors
    /// Returns error if the config cannot be loaded, a value is invalid, or
    /// --start is given without a zap.sh path.
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load_at(cli.config.as_deref())?;

        if let Some(ref url) = cli.zap_url {
            config.zap_url = url.clone();
        }
        if let Some(ref key) = cli.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(ref zap_sh) = cli.zapsh {
            config.zap_sh = Some(zap_sh.clone());
        }
        config.validate()?;

        if cli.target.trim().is_empty() {
            return Err(ConfigError::Invalid("target must not be empty".to_string()).into());
        }

        let start = if cli.start {
            Some(config.zap_sh.clone().ok_or(ConfigError::MissingZapSh)?)
        } else {
            None
        };

        let html_source = if cli.scanner_report {
            HtmlSource::Scanner
        } else {
            config.report.html_source
        };
        let report = ReportFile::select(cli.html_report.clone(), cli.xml_report.clone(), html_source);

        let client = Arc::new(ZapClient::new(&config.zap_url, config.api_key.clone())?);

        Ok(Self {
            plan: ScanPlan {
                target: cli.target.clone(),
                spider: cli.spider,
                active_scan: cli.active_scan,
            },
            settings: ScanSettings::from_config(&config),
            config,
            client,
            report,
            force: cli.force,
            start,
            stop: cli.stop,
            format: cli.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::report::ReportKind;
    use clap::Parser;

    fn write_config(dir: &std::path::Path, contents: &str) -> String {
        let path = dir.join("config.yaml");
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("zapit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_overrides_config() {
        let temp = tempfile::tempdir().unwrap();
        let config = write_config(
            temp.path(),
            "zap_url: http://config-host:8080\napi_key: from-config\n",
        );

        let cli = parse(&[
            "-t",
            "https://example.test",
            "--config",
            &config,
            "--zap-url",
            "http://cli-host:9090",
            "-k",
            "from-cli",
        ]);
        let ctx = RunContext::new(&cli).unwrap();

        assert_eq!(ctx.config.zap_url, "http://cli-host:9090");
        assert_eq!(ctx.config.api_key.as_deref(), Some("from-cli"));
        assert_eq!(ctx.client.base_url(), "http://cli-host:9090");
    }

    #[test]
    fn test_config_values_used_without_flags() {
        let temp = tempfile::tempdir().unwrap();
        let config = write_config(
            temp.path(),
            "zap_url: http://config-host:8080\nspider:\n  max_depth: 3\nreport:\n  html_source: scanner\n",
        );

        let cli = parse(&[
            "-t",
            "https://example.test",
            "--config",
            &config,
            "--zap-url",
            "http://config-host:8080",
            "--html-report",
            "r.html",
        ]);
        let ctx = RunContext::new(&cli).unwrap();

        assert_eq!(ctx.settings.max_depth, 3);
        assert_eq!(ctx.report.unwrap().kind, ReportKind::ScannerHtml);
    }

    #[test]
    fn test_start_requires_zap_sh() {
        let temp = tempfile::tempdir().unwrap();
        let config = write_config(temp.path(), "{}\n");

        let cli = parse(&["-t", "https://example.test", "--config", &config, "--start"]);
        let err = RunContext::new(&cli).err().unwrap();
        assert!(matches!(err, Error::Config(ConfigError::MissingZapSh)));

        let cli = parse(&[
            "-t",
            "https://example.test",
            "--config",
            &config,
            "--start",
            "--zapsh",
            "/opt/zap/zap.sh",
        ]);
        let ctx = RunContext::new(&cli).unwrap();
        assert_eq!(ctx.start, Some(PathBuf::from("/opt/zap/zap.sh")));
    }

    #[test]
    fn test_scanner_report_flag() {
        let temp = tempfile::tempdir().unwrap();
        let config = write_config(temp.path(), "{}\n");

        let cli = parse(&[
            "-t",
            "https://example.test",
            "--config",
            &config,
            "--html-report",
            "r.html",
            "--scanner-report",
        ]);
        let ctx = RunContext::new(&cli).unwrap();
        assert_eq!(ctx.report.unwrap().kind, ReportKind::ScannerHtml);
    }
}
