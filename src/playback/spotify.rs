use std::thread;
use std::time::Duration;

use crate::config::PlaybackSettings;
use crate::error::PlaybackError;
use crate::spotify::{NowPlaying, SpotifyClient, choose_device};

use super::{Ack, PlaybackController, SNIPPET_MARGIN_MS};

const VERIFY_POLLS: usize = 3;
const VERIFY_POLL_DELAY: Duration = Duration::from_millis(60);

/// Remote playback on one of the account's Spotify devices.
pub struct SpotifyPlayback<'a> {
    client: &'a SpotifyClient,
    device_id: Option<String>,
    snippet_ms: u64,
    attempts: u32,
    retry_delay: Duration,
}

impl<'a> SpotifyPlayback<'a> {
    pub fn new(client: &'a SpotifyClient, settings: &PlaybackSettings, snippet_seconds: u32) -> Self {
        Self {
            client,
            device_id: None,
            snippet_ms: u64::from(snippet_seconds.max(1)) * 1000,
            attempts: settings.start_attempts.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }

    fn resolve_device(&mut self) -> Result<String, PlaybackError> {
        let devices = self.client.devices()?;
        let id = choose_device(&devices, self.device_id.as_deref()).ok_or(PlaybackError::NoDevice)?;
        if self.device_id.as_deref() != Some(id.as_str()) {
            log::info!("[Playback] using device {id}");
        }
        self.device_id = Some(id.clone());
        Ok(id)
    }

    /// Poll the player until it reports `uri` with enough time left.
    fn has_snippet_window(&self, uri: &str) -> bool {
        let required = self.snippet_ms.saturating_sub(SNIPPET_MARGIN_MS);
        for poll in 0..VERIFY_POLLS {
            match self.client.now_playing() {
                Ok(Some(np)) if np.uri == uri => return window_ok(&np, required),
                Ok(_) => {}
                Err(e) => log::debug!("[Playback] state poll {poll} failed: {e}"),
            }
            thread::sleep(VERIFY_POLL_DELAY);
        }
        false
    }

    fn stop_quietly(&mut self) {
        if let Err(e) = self.pause() {
            log::warn!("[Playback] could not stop rejected start: {e}");
        }
    }

    /// One start on the chosen device. `Ok(false)` means the player is
    /// running but the snippet window check failed.
    fn try_start(&mut self, uri: &str, position_ms: u64) -> Result<bool, PlaybackError> {
        let device = self.resolve_device()?;
        self.client.transfer_playback(&device)?;
        self.client.start_playback(&device, uri, position_ms)?;
        Ok(self.has_snippet_window(uri))
    }
}

pub(super) fn window_ok(np: &NowPlaying, required_ms: u64) -> bool {
    np.remaining_ms() >= required_ms
}

impl PlaybackController for SpotifyPlayback<'_> {
    /// Retries transport failures at the same position. A window that is
    /// too short stops the player and is reported straight away so the
    /// caller can pick another position or track.
    fn start(&mut self, track_uri: &str, position_ms: u64) -> Result<Ack, PlaybackError> {
        let mut attempt = 1;
        loop {
            match self.try_start(track_uri, position_ms) {
                Ok(true) => return Ok(Ack),
                Ok(false) => {
                    log::warn!("[Playback] {track_uri} at {position_ms}ms: snippet window too short");
                    self.stop_quietly();
                    return Err(PlaybackError::SnippetWindow {
                        uri: track_uri.to_string(),
                    });
                }
                // Nothing to retry against.
                Err(PlaybackError::NoDevice) => return Err(PlaybackError::NoDevice),
                Err(e) if attempt < self.attempts => {
                    log::warn!("[Playback] attempt {attempt} failed: {e}");
                    attempt += 1;
                    thread::sleep(self.retry_delay);
                }
                Err(e) => {
                    // A failed request may still have reached the player.
                    self.stop_quietly();
                    return Err(e);
                }
            }
        }
    }

    fn pause(&mut self) -> Result<Ack, PlaybackError> {
        if let Some(id) = self.device_id.as_deref() {
            match self.client.pause_playback(Some(id)) {
                Ok(()) => return Ok(Ack),
                // The active device can change mid-round.
                Err(e) => log::debug!("[Playback] pause on {id} failed: {e}"),
            }
        }
        self.client.pause_playback(None)?;
        Ok(Ack)
    }
}
