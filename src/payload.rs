//! Grafana webhook payload decoding.
//!
//! Two shapes are accepted: unified alerting (`status` + `alerts[]` with an
//! `alertname` label) and legacy dashboard alerts (`ruleName` + `state`).
//! Unknown fields are ignored.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::PayloadError;
use crate::event::{AlertEvent, AlertState};

#[derive(Debug, Deserialize)]
struct UnifiedPayload {
    status: String,
    alerts: Option<Vec<UnifiedAlert>>,
}

#[derive(Debug, Deserialize)]
struct UnifiedAlert {
    status: String,
    labels: AlertLabels,
    #[serde(rename = "valueString", default)]
    value_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertLabels {
    alertname: String,
}

#[derive(Debug, Deserialize)]
struct LegacyPayload {
    #[serde(rename = "ruleName")]
    rule_name: String,
    state: String,
    #[serde(rename = "evalMatches", default)]
    eval_matches: Vec<EvalMatch>,
}

#[derive(Debug, Deserialize)]
struct EvalMatch {
    #[serde(default)]
    metric: String,
    #[serde(default)]
    value: Value,
}

/// Decode a request body into alert events.
pub fn decode(body: &[u8]) -> Result<Vec<AlertEvent>, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PayloadError::Empty);
    }

    let value: Value = serde_json::from_slice(body)?;

    if value.get("alerts").is_some() || value.get("ruleName").is_none() {
        let payload: UnifiedPayload = serde_json::from_value(value)?;
        let alerts = payload.alerts.ok_or(PayloadError::NoAlerts)?;
        debug!("Payload status '{}' with {} alert(s)", payload.status, alerts.len());
        return Ok(alerts.into_iter().map(AlertEvent::from).collect());
    }

    let payload: LegacyPayload = serde_json::from_value(value)?;
    Ok(vec![AlertEvent::from(payload)])
}

impl From<UnifiedAlert> for AlertEvent {
    fn from(alert: UnifiedAlert) -> Self {
        Self {
            rule_name: alert.labels.alertname,
            state: AlertState::from_status(&alert.status),
            value_string: alert.value_string.filter(|v| !v.is_empty()),
        }
    }
}

impl From<LegacyPayload> for AlertEvent {
    fn from(payload: LegacyPayload) -> Self {
        let value_string = if payload.eval_matches.is_empty() {
            None
        } else {
            Some(
                payload
                    .eval_matches
                    .iter()
                    .map(|m| match m.value.as_str() {
                        Some(text) => format!("{}={text}", m.metric),
                        None => format!("{}={}", m.metric, m.value),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        Self {
            rule_name: payload.rule_name,
            state: AlertState::from_status(&payload.state),
            value_string,
        }
    }
}
