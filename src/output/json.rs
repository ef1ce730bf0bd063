//! JSON output formatting

use chrono::Utc;
use serde::Serialize;

/// Envelope for JSON output
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub data: T,
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// When the output was produced (RFC 3339)
    pub timestamp: String,

    /// zapit version
    pub version: String,
}

impl<T> JsonOutput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Format data as pretty-printed JSON inside the envelope
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::alert;
    use crate::models::RunOutcome;
    use crate::scan::{PhaseOutcome, ScanResults, ScanRun};

    #[test]
    fn test_run_outcome_json_envelope() {
        let outcome = RunOutcome::from_run(
            "https://example.test",
            ScanRun::Finished(ScanResults {
                hosts: vec!["example.test".to_string()],
                alerts: vec![alert(&[("name", "XSS"), ("risk", "High")])],
                spider: PhaseOutcome::Completed,
                active_scan: PhaseOutcome::Skipped,
            }),
        );

        let text = format_json(&outcome).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["data"]["target"], "https://example.test");
        assert_eq!(value["data"]["scan"]["status"], "completed");
        assert_eq!(value["data"]["spider"]["status"], "completed");
        assert_eq!(value["data"]["active_scan"]["status"], "skipped");
        assert_eq!(value["data"]["alerts"][0]["name"], "XSS");
        assert_eq!(value["data"]["risk_summary"][0]["count"], 1);
        assert_eq!(value["meta"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(value["meta"]["timestamp"].is_string());
    }
}
