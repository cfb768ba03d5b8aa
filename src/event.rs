//! Internal alert representation, independent of any webhook payload format.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertState {
    Firing,
    Resolved,
    /// Any other lifecycle state (pending, no data, ...). Never plays.
    Other(String),
}

impl AlertState {
    /// Map a Grafana status string. Legacy alerting reports `alerting`
    /// and `ok` where unified alerting reports `firing` and `resolved`.
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "firing" | "alerting" => Self::Firing,
            "resolved" | "ok" => Self::Resolved,
            _ => Self::Other(status.to_string()),
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firing => write!(f, "firing"),
            Self::Resolved => write!(f, "resolved"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// One inbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub rule_name: String,
    pub state: AlertState,
    pub value_string: Option<String>,
}

impl AlertEvent {
    pub fn new(rule_name: impl Into<String>, state: AlertState) -> Self {
        Self {
            rule_name: rule_name.into(),
            state,
            value_string: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value_string = Some(value.into());
        self
    }

    pub fn is_firing(&self) -> bool {
        self.state == AlertState::Firing
    }
}
