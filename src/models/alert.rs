//! Alert display model

use serde::Serialize;
use tabled::Tabled;

use crate::client::Alert;
use crate::report::risk_rank;

/// One row of the findings table
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct AlertRow {
    #[tabled(rename = "RISK")]
    pub risk: String,

    #[tabled(rename = "ALERT")]
    pub name: String,

    #[tabled(rename = "URL")]
    pub url: String,

    #[tabled(rename = "PARAM")]
    pub param: String,
}

impl From<&Alert> for AlertRow {
    fn from(alert: &Alert) -> Self {
        // Older ZAP versions only fill `alert`, newer ones both
        let name = field(alert, "name")
            .or_else(|| field(alert, "alert"))
            .unwrap_or("--");

        Self {
            risk: field(alert, "risk").unwrap_or("--").to_string(),
            name: truncate_string(name, 45),
            url: truncate_string(field(alert, "url").unwrap_or("--"), 60),
            param: truncate_string(field(alert, "param").unwrap_or("--"), 20),
        }
    }
}

impl AlertRow {
    /// Rows for all alerts, highest risk first, stable within a risk level
    pub fn from_alerts(alerts: &[Alert]) -> Vec<Self> {
        let mut rows: Vec<Self> = alerts.iter().map(Self::from).collect();
        rows.sort_by_key(|row| risk_rank(&row.risk));
        rows
    }
}

fn field<'a>(alert: &'a Alert, key: &str) -> Option<&'a str> {
    alert
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// Truncate to `max_len` characters with an ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
