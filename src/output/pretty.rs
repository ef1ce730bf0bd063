//! Human-readable run summary

use colored::Colorize;
use tabled::{
    Table,
    settings::{Alignment, Modify, Style, object::Rows},
};

use super::Formattable;
use super::json::format_json;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::models::{AlertRow, ReportOutcome, RunOutcome, ScanStatus};
use crate::scan::PhaseOutcome;

impl Formattable for RunOutcome {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(format_outcome(self)),
            OutputFormat::Json => Ok(format_json(self)?),
        }
    }
}

/// Summary block printed at the end of a run
pub fn format_outcome(outcome: &RunOutcome) -> String {
    let mut lines = Vec::new();

    let status = match &outcome.scan {
        ScanStatus::Completed => "completed".green().to_string(),
        ScanStatus::Incomplete => "incomplete (a phase timed out)".yellow().to_string(),
        ScanStatus::Cancelled => "cancelled".yellow().to_string(),
        ScanStatus::Failed { message } => format!("{} ({})", "failed".red(), message),
    };
    lines.push(format!("{} {}", "Scan:".bold(), status));
    lines.push(format!("Target: {}", outcome.target));

    for (label, phase) in [("Spider", outcome.spider), ("Active scan", outcome.active_scan)] {
        if let PhaseOutcome::TimedOut { progress } = phase {
            lines.push(format!("{} timed out at {}%", label, progress));
        }
    }

    if outcome.has_results() {
        if !outcome.hosts.is_empty() {
            lines.push(format!("Hosts: {}", outcome.hosts.join(", ")));
        }

        lines.push(String::new());
        lines.push(format_alert_table(&AlertRow::from_alerts(&outcome.alerts)));

        if !outcome.risk_summary.is_empty() {
            let summary: Vec<String> = outcome
                .risk_summary
                .iter()
                .map(|r| format!("{}: {}", r.risk, r.count))
                .collect();
            lines.push(format!(
                "{} alerts ({})",
                outcome.alerts.len(),
                summary.join(" | ")
            ));
        }
    }

    match &outcome.report {
        Some(ReportOutcome::Saved { path, kind }) => lines.push(format!(
            "{} {} report saved at {}",
            "Success:".green(),
            kind,
            path.display()
        )),
        Some(ReportOutcome::Failed { path, message }) => lines.push(format!(
            "{} Unable to save report {}: {}",
            "Error:".red(),
            path.display(),
            message
        )),
        None => {}
    }

    match outcome.scanner_stopped {
        Some(true) => lines.push("Scanner shut down".to_string()),
        Some(false) => lines.push(format!("{} scanner did not accept shutdown", "Warning:".yellow())),
        None => {}
    }

    lines.join("\n")
}

/// Rounded findings table, or a short notice when empty
pub fn format_alert_table(rows: &[AlertRow]) -> String {
    if rows.is_empty() {
        return "No alerts found.".to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::alert;
    use crate::report::ReportKind;
    use crate::scan::{ScanResults, ScanRun};
    use std::path::PathBuf;

    fn finished(alerts: Vec<crate::client::Alert>) -> RunOutcome {
        RunOutcome::from_run(
            "https://example.test",
            ScanRun::Finished(ScanResults {
                hosts: vec!["example.test".to_string(), "cdn.example.test".to_string()],
                alerts,
                spider: PhaseOutcome::Completed,
                active_scan: PhaseOutcome::Skipped,
            }),
        )
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(format_alert_table(&[]), "No alerts found.");
    }

    #[test]
    fn test_table_uses_rounded_style() {
        let rows = AlertRow::from_alerts(&[alert(&[("name", "XSS"), ("risk", "High")])]);
        let table = format_alert_table(&rows);

        assert!(table.contains("RISK"));
        assert!(table.contains("XSS"));
        assert!(table.contains("╭"));
        assert!(table.contains("╰"));
    }

    #[test]
    fn test_outcome_lists_hosts_alerts_and_report() {
        let mut outcome = finished(vec![
            alert(&[("name", "XSS"), ("risk", "High")]),
            alert(&[("name", "Cookie without SameSite"), ("risk", "Low")]),
        ]);
        outcome.report = Some(ReportOutcome::Saved {
            path: PathBuf::from("/tmp/r.html"),
            kind: ReportKind::TemplateHtml,
        });

        let text = format_outcome(&outcome);

        assert!(text.contains("completed"));
        assert!(text.contains("Hosts: example.test, cdn.example.test"));
        assert!(text.contains("XSS"));
        assert!(text.contains("2 alerts (High: 1 | Low: 1)"));
        assert!(text.contains("HTML report saved at /tmp/r.html"));
    }

    #[test]
    fn test_failed_outcome_shows_message_only() {
        let text = format_outcome(&RunOutcome::failed(
            "https://example.test",
            "Network error: Failed to connect to the scanner API",
        ));

        assert!(text.contains("failed"));
        assert!(text.contains("Failed to connect"));
        assert!(!text.contains("No alerts found."));
    }

    #[test]
    fn test_timed_out_phase_is_reported() {
        let mut outcome = finished(vec![]);
        outcome.spider = PhaseOutcome::TimedOut { progress: 42 };

        let text = format_outcome(&outcome);
        assert!(text.contains("Spider timed out at 42%"));
    }
}
