//! Configuration management for musicalert.
//!
//! Loads config from a YAML file in standard locations. Unlike most settings,
//! the sound mappings have no sensible default, so a missing or unparsable
//! file is a startup error rather than a fallback to defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::{info, Level};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Overrides the log level given on the command line.
    pub log_level: Option<String>,
}

impl GlobalConfig {
    pub fn level(&self) -> Result<Option<Level>, ConfigError> {
        self.log_level.as_deref().map(parse_level).transpose()
    }
}

/// Parse a log level name, accepting the usual aliases (`warning`,
/// `critical`) next to the tracing level names.
pub fn parse_level(raw: &str) -> Result<Level, ConfigError> {
    let normalized = match raw.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    normalized
        .parse::<Level>()
        .map_err(|_| ConfigError::InvalidLogLevel(raw.to_string()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When set, webhook requests must carry exactly this User-Agent.
    pub required_user_agent: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8333,
            required_user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerBackend {
    /// External player process, invoked as `<command> -q <file>`.
    #[default]
    Mpg123,
    /// In-process decoding and output through rodio.
    Rodio,
}

impl PlayerBackend {
    /// File extensions this backend can play.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Mpg123 => &["mp3"],
            Self::Rodio => &["mp3", "wav", "flac", "ogg"],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub backend: PlayerBackend,
    pub command: String,
    pub timeout_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            backend: PlayerBackend::Mpg123,
            command: "mpg123".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct QuietHoursConfig {
    pub start_hr: Option<u32>,
    pub end_hr: Option<u32>,
}

/// Match criterion as written in the config: a bare rule name, or a
/// `[rule name, value regex]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SoundCriterion {
    Name(String),
    NameAndValue(String, String),
}

/// One `file: criterion` entry of the `sounds` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundMapping {
    pub file: PathBuf,
    pub criterion: SoundCriterion,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub global: GlobalConfig,
    pub server: ServerConfig,
    pub player: PlayerConfig,
    #[serde(deserialize_with = "ordered_sounds")]
    pub sounds: Vec<SoundMapping>,
    pub quiet_hours: QuietHoursConfig,

    /// Directory relative audio paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/musicalert/config.yaml
    /// 3. /etc/musicalert/config.yaml
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let candidates: Vec<PathBuf> = [
                    std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                    dirs::home_dir().map(|h| h.join(".config/musicalert/config.yaml")),
                    Some(PathBuf::from("/etc/musicalert/config.yaml")),
                ]
                .into_iter()
                .flatten()
                .collect();

                match candidates.iter().find(|p| p.exists()) {
                    Some(found) => found.clone(),
                    None => {
                        let tried = candidates
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ");
                        return Err(ConfigError::NotFound { tried });
                    }
                }
            }
        };

        let contents =
            std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;

        let mut config = Self::from_yaml(&contents, &config_path)?;
        config.base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse YAML contents. `origin` is only used for error messages.
    pub fn from_yaml(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Resolve a configured audio path against the config file's directory.
    pub fn resolve_audio_path(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir.join(file)
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Server {}:{}, player {:?} ('{}', timeout {}s), {} sound mapping(s)",
            self.server.host,
            self.server.port,
            self.player.backend,
            self.player.command,
            self.player.timeout_secs,
            self.sounds.len()
        );
    }
}

/// Deserialize the `sounds` mapping keeping the order it was written in,
/// since the first matching entry wins.
fn ordered_sounds<'de, D>(deserializer: D) -> Result<Vec<SoundMapping>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SoundsVisitor;

    impl<'de> Visitor<'de> for SoundsVisitor {
        type Value = Vec<SoundMapping>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of audio file to rule name or [rule name, value regex]")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut sounds = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((file, criterion)) = map.next_entry::<PathBuf, SoundCriterion>()? {
                sounds.push(SoundMapping { file, criterion });
            }
            Ok(sounds)
        }
    }

    deserializer.deserialize_map(SoundsVisitor)
}
