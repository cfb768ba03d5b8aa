//! Audio player backends.
//!
//! Both backends block the calling thread until the file has finished
//! playing, failed, or hit the timeout. The serializer runs them on a
//! blocking worker.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStreamBuilder, Sink};
use tracing::{debug, info, warn};

use crate::config::{PlayerBackend, PlayerConfig};
use crate::error::{ConfigError, PlaybackError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub trait AudioPlayer: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Plays files through an external command, `mpg123 -q <file>` by default.
pub struct ProcessPlayer {
    command: String,
    timeout: Duration,
}

impl ProcessPlayer {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

impl AudioPlayer for ProcessPlayer {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let mut child = Command::new(&self.command)
            .arg("-q")
            .arg(path)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                if !status.success() {
                    return Err(PlaybackError::ExitStatus(status));
                }
                return Ok(());
            }

            if Instant::now() >= deadline {
                warn!("Player still running after {:?}, terminating", self.timeout);
                if let Err(e) = child.kill() {
                    warn!("Failed to kill player: {e}");
                }
                if let Err(e) = child.wait() {
                    warn!("Failed to reap player: {e}");
                }
                return Err(PlaybackError::Timeout(self.timeout.as_secs()));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Decodes and plays files in-process on the default output device.
pub struct RodioPlayer {
    timeout: Duration,
}

impl RodioPlayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        // Opened per playback so the device is only held while a sound plays
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::Output(e.to_string()))?;
        stream.log_on_drop(false);

        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);

        let deadline = Instant::now() + self.timeout;
        while !sink.empty() {
            if Instant::now() >= deadline {
                sink.stop();
                return Err(PlaybackError::Timeout(self.timeout.as_secs()));
            }
            thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}

/// Build the configured player, checking up front that it can run at all.
pub fn build_player(config: &PlayerConfig) -> Result<Arc<dyn AudioPlayer>, ConfigError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.backend {
        PlayerBackend::Mpg123 => {
            let resolved = find_executable(&config.command)
                .ok_or_else(|| ConfigError::PlayerNotFound(config.command.clone()))?;
            info!("Using player executable {}", resolved.display());
            Ok(Arc::new(ProcessPlayer::new(config.command.clone(), timeout)))
        }
        PlayerBackend::Rodio => {
            info!("Using native rodio playback");
            Ok(Arc::new(RodioPlayer::new(timeout)))
        }
    }
}

/// Locate `command` the way a shell would: as a path if it contains a
/// separator, otherwise in each `PATH` directory.
pub fn find_executable(command: &str) -> Option<PathBuf> {
    let candidate = Path::new(command);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(command))
        .find(|p| is_executable(p))
        .inspect(|p| debug!("Found '{command}' at {}", p.display()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
