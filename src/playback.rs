//! Exclusive playback: at most one sound plays at a time, system-wide.
//!
//! A request that arrives while something is playing is dropped, not
//! queued, and does not interrupt the current sound.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::player::AudioPlayer;

#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub path: PathBuf,
    pub received_at: DateTime<Local>,
}

impl PlaybackRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            received_at: Local::now(),
        }
    }
}

#[derive(Clone)]
pub struct PlaybackSerializer {
    player: Arc<dyn AudioPlayer>,
    slot: Arc<AsyncMutex<()>>,
    /// Mirrors the slot for status reads, which must never contend for it.
    playing: Arc<AtomicBool>,
}

impl PlaybackSerializer {
    pub fn new(player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            player,
            slot: Arc::new(AsyncMutex::new(())),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Start playing `request` in the background.
    ///
    /// Returns `None` when another sound is already playing and the request
    /// was dropped. The returned task finishes when the player does; its
    /// failures are logged there and never reach the caller.
    pub fn play(&self, request: PlaybackRequest) -> Option<JoinHandle<()>> {
        let Ok(guard) = self.slot.clone().try_lock_owned() else {
            info!("Already playing, dropping '{}'", request.path.display());
            return None;
        };
        self.playing.store(true, Ordering::SeqCst);

        let player = self.player.clone();
        let playing = self.playing.clone();
        Some(tokio::spawn(async move {
            let path = request.path.clone();
            debug!(
                "Working on '{}' (received {})",
                path.display(),
                request.received_at.format("%H:%M:%S")
            );
            info!("Playing '{}'", path.display());

            let result = tokio::task::spawn_blocking(move || player.play(&request.path)).await;
            match result {
                Ok(Ok(())) => debug!("Finished '{}'", path.display()),
                Ok(Err(e)) => warn!("Playback of '{}' failed: {e}", path.display()),
                Err(e) => warn!("Playback task for '{}' panicked: {e}", path.display()),
            }

            playing.store(false, Ordering::SeqCst);
            drop(guard);
        }))
    }
}
