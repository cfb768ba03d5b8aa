//! Time-of-day gate for audible notifications.
//!
//! Playback is allowed for `start_hr <= hour < end_hr`. Windows that wrap
//! midnight are rejected at load time.

use tracing::debug;

use crate::config::QuietHoursConfig;
use crate::error::ConfigError;

pub const DEFAULT_START_HR: u32 = 8;
pub const DEFAULT_END_HR: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    start_hr: u32,
    end_hr: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start_hr: DEFAULT_START_HR,
            end_hr: DEFAULT_END_HR,
        }
    }
}

impl QuietHours {
    pub fn new(start_hr: u32, end_hr: u32) -> Result<Self, ConfigError> {
        if start_hr >= end_hr || end_hr > 24 {
            return Err(ConfigError::InvalidQuietHours { start_hr, end_hr });
        }
        Ok(Self { start_hr, end_hr })
    }

    /// Build from the optional config overrides, filling gaps with defaults.
    pub fn from_config(config: &QuietHoursConfig) -> Result<Self, ConfigError> {
        let start_hr = config.start_hr.unwrap_or(DEFAULT_START_HR);
        let end_hr = config.end_hr.unwrap_or(DEFAULT_END_HR);
        debug!("Using range: [{start_hr}, {end_hr}) hours");
        Self::new(start_hr, end_hr)
    }

    pub fn start_hr(&self) -> u32 {
        self.start_hr
    }

    pub fn end_hr(&self) -> u32 {
        self.end_hr
    }

    pub fn is_allowed(&self, hour: u32) -> bool {
        self.start_hr <= hour && hour < self.end_hr
    }
}
