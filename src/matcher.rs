//! Decides which sound, if any, an alert should play.

use std::path::Path;

use chrono::{Local, Timelike};
use tracing::{debug, info};

use crate::event::AlertEvent;
use crate::quiet_hours::QuietHours;
use crate::rules::RuleTable;

/// Source of the current local hour.
pub trait Clock: Send + Sync {
    fn current_hour(&self) -> u32;
}

/// Wall clock in the local timezone.
pub struct LocalClock;

impl Clock for LocalClock {
    fn current_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Clock pinned to one hour.
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn current_hour(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Matcher {
    rules: RuleTable,
    quiet_hours: QuietHours,
}

impl Matcher {
    pub fn new(rules: RuleTable, quiet_hours: QuietHours) -> Self {
        Self { rules, quiet_hours }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn quiet_hours(&self) -> QuietHours {
        self.quiet_hours
    }

    pub fn decide(&self, event: &AlertEvent, now_hour: u32) -> Option<&Path> {
        if !event.is_firing() {
            debug!("'{}' is {}, not firing", event.rule_name, event.state);
            return None;
        }

        let Some(file) = self.rules.find(event) else {
            info!(
                "Alert '{}' not found in the mappings ({} rules)",
                event.rule_name,
                self.rules.len()
            );
            return None;
        };

        if !self.quiet_hours.is_allowed(now_hour) {
            info!(
                "Alert '{}' at hour {now_hour} is outside [{}, {}), not playing",
                event.rule_name,
                self.quiet_hours.start_hr(),
                self.quiet_hours.end_hr()
            );
            return None;
        }

        debug!("Will play '{}' for alert '{}'", file.display(), event.rule_name);
        Some(file)
    }
}
