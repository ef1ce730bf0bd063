//! CLI definition and handlers

use std::path::PathBuf;

use clap::Parser;

pub mod console;
pub mod context;
pub mod run;

pub use context::RunContext;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with a findings table
    #[default]
    Pretty,
    /// JSON run outcome for scripts
    Json,
}

/// zapit - drive a headless OWASP ZAP: spider, active scan and report
#[derive(Parser, Debug)]
#[command(name = "zapit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The target / URL to scan (https://scanme.example.com)
    #[arg(
        short = 't',
        long = "target",
        visible_short_alias = 'u',
        visible_alias = "url",
        value_name = "URL"
    )]
    pub target: String,

    /// API key configured in ZAP
    #[arg(short = 'k', long, env = "ZAPIT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Spider the target
    #[arg(short = 's', long)]
    pub spider: bool,

    /// Run an active scan against the target
    #[arg(short = 'a', long)]
    pub active_scan: bool,

    /// Write an HTML report to PATH
    #[arg(long, value_name = "PATH")]
    pub html_report: Option<PathBuf>,

    /// Write ZAP's XML report to PATH (ignored when --html-report is given)
    #[arg(long, value_name = "PATH")]
    pub xml_report: Option<PathBuf>,

    /// Use ZAP's own HTML report instead of the bundled template
    #[arg(long)]
    pub scanner_report: bool,

    /// Overwrite the report file if it exists
    #[arg(long)]
    pub force: bool,

    /// Start ZAP in daemon mode before scanning (needs --zapsh)
    #[arg(long)]
    pub start: bool,

    /// Shut ZAP down when the run ends
    #[arg(long)]
    pub stop: bool,

    /// Path to zap.sh
    #[arg(long, value_name = "PATH")]
    pub zapsh: Option<PathBuf>,

    /// ZAP API address
    #[arg(long, env = "ZAPIT_ZAP_URL", hide_env = true, value_name = "URL")]
    pub zap_url: Option<String>,

    /// Override config file location
    #[arg(long, env = "ZAPIT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Output format (pretty, json)
    #[arg(
        long,
        env = "ZAPIT_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(long, env = "ZAPIT_DEBUG", hide_env = true)]
    pub debug: bool,
}
