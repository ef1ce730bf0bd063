//! ASCII-only copies of scanner alerts

use serde::Serialize;

use crate::client::Alert;

/// An alert whose field names and values are ASCII only.
///
/// Fields are kept as a list, so two names that only differed in non-ASCII
/// characters stay separate fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedAlert {
    /// `name`, or `alert` on older scanners
    pub title: Option<String>,
    pub risk: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl SanitizedAlert {
    /// First field called `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).map(str::to_string)
    }
}

/// Replace every non-ASCII character in alert keys and values with a space.
///
/// Order, alert count, field count per alert and per-string character count
/// are preserved.
pub fn sanitize_alerts(alerts: &[Alert]) -> Vec<SanitizedAlert> {
    alerts.iter().map(sanitize_alert).collect()
}

fn sanitize_alert(alert: &Alert) -> SanitizedAlert {
    let mut sanitized = SanitizedAlert {
        title: None,
        risk: None,
        fields: alert
            .iter()
            .map(|(key, value)| (to_ascii_lossy(key), to_ascii_lossy(value)))
            .collect(),
    };
    sanitized.title = sanitized
        .non_empty("name")
        .or_else(|| sanitized.non_empty("alert"));
    sanitized.risk = sanitized.non_empty("risk");
    sanitized
}

fn to_ascii_lossy(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c } else { ' ' })
        .collect()
}
