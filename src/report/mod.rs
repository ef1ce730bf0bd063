//! Report generation
//!
//! A report is either rendered locally from the HTML template or fetched
//! ready-made from the scanner. Either way an existing file is only replaced
//! when the caller forces it, and the new file is created exclusively so no
//! bytes of an older report survive.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::client::{Alert, ReportFormat, ScannerApi};
use crate::config::HtmlSource;
use crate::error::ReportError;

pub mod sanitize;
pub mod template;

pub use sanitize::sanitize_alerts;
pub use template::TemplateRenderer;

/// Which report is produced and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Bundled template rendered locally
    TemplateHtml,
    /// HTML generated by the scanner
    ScannerHtml,
    /// XML generated by the scanner
    ScannerXml,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::TemplateHtml | ReportKind::ScannerHtml => write!(f, "HTML"),
            ReportKind::ScannerXml => write!(f, "XML"),
        }
    }
}

/// Destination and kind of the report for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub path: PathBuf,
    pub kind: ReportKind,
}

impl ReportFile {
    /// Pick the report from the CLI flags; HTML wins when both are given
    pub fn select(
        html: Option<PathBuf>,
        xml: Option<PathBuf>,
        html_source: HtmlSource,
    ) -> Option<Self> {
        if let Some(path) = html {
            if xml.is_some() {
                warn!("Both --html-report and --xml-report given; writing the HTML report only");
            }
            let kind = match html_source {
                HtmlSource::Template => ReportKind::TemplateHtml,
                HtmlSource::Scanner => ReportKind::ScannerHtml,
            };
            return Some(Self { path, kind });
        }

        xml.map(|path| Self {
            path,
            kind: ReportKind::ScannerXml,
        })
    }

    /// Refuse to go on when the destination exists and overwriting is not forced
    pub fn check_destination(&self, force: bool) -> Result<(), ReportError> {
        if self.path.exists() && !force {
            return Err(ReportError::Exists(self.path.clone()));
        }
        Ok(())
    }
}

/// Alerts per risk level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskCount {
    pub risk: String,
    pub count: usize,
}

/// Rank used to order risk levels, highest first
pub fn risk_rank(risk: &str) -> u8 {
    match risk {
        "High" => 0,
        "Medium" => 1,
        "Low" => 2,
        "Informational" => 3,
        _ => 4,
    }
}

/// Count alerts per `risk` field, highest risk first
pub fn count_by_risk(alerts: &[Alert]) -> Vec<RiskCount> {
    let mut counts: BTreeMap<(u8, String), usize> = BTreeMap::new();
    for alert in alerts {
        let risk = alert
            .get("risk")
            .filter(|r| !r.is_empty())
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        *counts.entry((risk_rank(&risk), risk)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((_, risk), count)| RiskCount { risk, count })
        .collect()
}

/// Produce the report body and write it to `report.path`.
///
/// The body is built before the destination is touched, so a failed render or
/// fetch leaves an existing file in place.
pub async fn save_report<C: ScannerApi + ?Sized>(
    client: &C,
    report: &ReportFile,
    alerts: &[Alert],
    target: &str,
    renderer: &TemplateRenderer,
    force: bool,
) -> Result<(), ReportError> {
    let body = match report.kind {
        ReportKind::TemplateHtml => renderer
            .render(&sanitize_alerts(alerts), &count_by_risk(alerts), target)?
            .into_bytes(),
        ReportKind::ScannerHtml => client
            .report(ReportFormat::Html)
            .await
            .map_err(fetch_error)?,
        ReportKind::ScannerXml => client
            .report(ReportFormat::Xml)
            .await
            .map_err(fetch_error)?,
    };

    prepare_destination(&report.path, force)?;
    write_new(&report.path, &body)
}

fn fetch_error(err: crate::error::Error) -> ReportError {
    match err {
        crate::error::Error::Api(api) => ReportError::Fetch(api),
        other => ReportError::Fetch(crate::error::ApiError::InvalidResponse(other.to_string())),
    }
}

/// Remove an existing file when forced; a file without force is a conflict
fn prepare_destination(path: &Path, force: bool) -> Result<(), ReportError> {
    if !path.exists() {
        return Ok(());
    }
    if !force {
        return Err(ReportError::Exists(path.to_path_buf()));
    }

    debug!("Removing existing report {}", path.display());
    fs::remove_file(path).map_err(|source| ReportError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// Create `path` (which must not exist) and write `body`, removing the file
/// again if the write fails half way
fn write_new(path: &Path, body: &[u8]) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(write_err)?;

    let written = file.write_all(body).and_then(|_| file.flush());
    if let Err(source) = written {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(write_err(source));
    }
    Ok(())
}
