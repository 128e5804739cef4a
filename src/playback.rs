//! Playback controllers: the only things that make sound.
//!
//! The round engine depends on two synchronous calls, `start` and `pause`.
//! `start` returns once the controller believes audio is running at the
//! requested position; how long that takes is the controller's business.

use rand::Rng;

use crate::error::PlaybackError;

mod local;
mod sink;
mod spotify;

pub use local::LocalPlayback;
pub use spotify::SpotifyPlayback;

/// Acknowledgement that a playback command took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

pub trait PlaybackController {
    /// Start `track_uri` at `position_ms` and return once it is playing.
    fn start(&mut self, track_uri: &str, position_ms: u64) -> Result<Ack, PlaybackError>;

    /// Stop whatever is playing. Best-effort.
    fn pause(&mut self) -> Result<Ack, PlaybackError>;
}

/// Slack kept between the end of the snippet and the end of the track,
/// absorbing position drift between the start call and the live player.
pub const SNIPPET_MARGIN_MS: u64 = 1500;

/// Random start position leaving the whole snippet (plus margin, when the
/// track is long enough) before the end of the track.
///
/// `None` when the track is shorter than the snippet.
pub fn snippet_start_ms<R: Rng + ?Sized>(
    duration_ms: u64,
    snippet_ms: u64,
    rng: &mut R,
) -> Option<u64> {
    if duration_ms < snippet_ms {
        return None;
    }
    let max_start = duration_ms.saturating_sub(snippet_ms + SNIPPET_MARGIN_MS);
    if max_start == 0 {
        return Some(0);
    }
    Some(rng.random_range(0..=max_start))
}
