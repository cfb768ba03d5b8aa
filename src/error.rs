//! Error types for musicalert.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Fatal startup errors. The service refuses to start when any of these occur.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file given and none found in the standard locations.
    #[error("no configuration file found (tried {tried})")]
    NotFound {
        /// Locations that were searched.
        tried: String,
    },

    /// The config file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for the expected schema.
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// The config has no sound mappings.
    #[error("no sound mappings configured")]
    NoRules,

    /// A mapped audio file does not exist or cannot be opened.
    #[error("audio file '{}' cannot be opened for reading: {source}", .path.display())]
    AudioFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mapped audio file has an extension the player backend cannot play.
    #[error("audio file '{}' is not one of: {expected}", .path.display())]
    UnsupportedAudioFile { path: PathBuf, expected: String },

    /// A value pattern is not a valid regular expression.
    #[error("invalid value pattern '{pattern}' for '{}': {source}", .file.display())]
    InvalidPattern {
        file: PathBuf,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Quiet-hours bounds are out of range or not ordered.
    #[error("invalid quiet hours [{start_hr}, {end_hr}): need 0 <= start_hr < end_hr <= 24")]
    InvalidQuietHours { start_hr: u32, end_hr: u32 },

    /// Unknown log level string.
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    /// The player executable cannot be located.
    #[error("cannot find player executable '{0}'")]
    PlayerNotFound(String),
}

/// Per-request errors for inbound webhook payloads. Reported as 400.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("empty request body")]
    Empty,

    #[error("unexpected User-Agent {found:?}, expected '{expected}'")]
    UserAgent {
        expected: String,
        found: Option<String>,
    },

    #[error("malformed alert payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("alert payload has no alerts")]
    NoAlerts,
}

impl IntoResponse for PayloadError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": "error",
            "error": self.to_string(),
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Playback failures. Logged by the serializer and never surfaced to the caller.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("player exited with {0}")]
    ExitStatus(std::process::ExitStatus),

    #[error("playback timed out after {0}s")]
    Timeout(u64),

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("cannot decode '{}': {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("i/o error during playback: {0}")]
    Io(#[from] std::io::Error),
}
