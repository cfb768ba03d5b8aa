//! Ordered alert → audio file rule table.

use std::fs::File;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::config::{Config, PlayerBackend, SoundCriterion};
use crate::error::ConfigError;
use crate::event::AlertEvent;

#[derive(Debug, Clone)]
pub enum MatchCriterion {
    /// Match on the rule name alone.
    ExactOnly(String),
    /// Match on the rule name and a regex found anywhere in the value string.
    ExactPlusPattern(String, Regex),
}

impl MatchCriterion {
    pub fn rule_name(&self) -> &str {
        match self {
            Self::ExactOnly(name) | Self::ExactPlusPattern(name, _) => name,
        }
    }

    pub fn matches(&self, event: &AlertEvent) -> bool {
        match self {
            Self::ExactOnly(name) => *name == event.rule_name,
            Self::ExactPlusPattern(name, pattern) => {
                *name == event.rule_name
                    && event
                        .value_string
                        .as_deref()
                        .is_some_and(|value| pattern.is_match(value))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pub audio_file: PathBuf,
    pub criterion: MatchCriterion,
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<MatchRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    /// Build the table from the `sounds` section, checking that every file
    /// is playable by the configured backend and can be opened now.
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        if config.sounds.is_empty() {
            return Err(ConfigError::NoRules);
        }

        let mut rules = Vec::with_capacity(config.sounds.len());
        for mapping in &config.sounds {
            let audio_file = config.resolve_audio_path(&mapping.file);
            debug!("Checking file '{}'", audio_file.display());

            check_extension(&audio_file, config.player.backend)?;
            File::open(&audio_file).map_err(|source| ConfigError::AudioFileUnreadable {
                path: audio_file.clone(),
                source,
            })?;

            let criterion = match &mapping.criterion {
                SoundCriterion::Name(name) => MatchCriterion::ExactOnly(name.clone()),
                SoundCriterion::NameAndValue(name, pattern) => {
                    let regex =
                        Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                            file: mapping.file.clone(),
                            pattern: pattern.clone(),
                            source,
                        })?;
                    MatchCriterion::ExactPlusPattern(name.clone(), regex)
                }
            };

            rules.push(MatchRule {
                audio_file,
                criterion,
            });
        }

        debug!("File mappings: {:?}", rules);
        Ok(Self { rules })
    }

    /// Audio file of the first rule matching the event, in configured order.
    pub fn find(&self, event: &AlertEvent) -> Option<&Path> {
        self.rules
            .iter()
            .find(|rule| rule.criterion.matches(event))
            .map(|rule| rule.audio_file.as_path())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }
}

fn check_extension(path: &Path, backend: PlayerBackend) -> Result<(), ConfigError> {
    let allowed = backend.extensions();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        _ => Err(ConfigError::UnsupportedAudioFile {
            path: path.to_path_buf(),
            expected: allowed.join(", "),
        }),
    }
}
