//! Error types shared across the game.

use thiserror::Error;

/// Errors that stop a round from starting. Once a round is racing it always
/// resolves to a `RoundOutcome` instead.
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("need at least {required} distinct tracks to play, library has {available}")]
    InsufficientLibrary { required: usize, available: usize },

    #[error("playback unavailable: {0}")]
    PlaybackUnavailable(#[source] PlaybackError),

    #[error("no track in the library is at least {snippet_seconds}s long")]
    NoPlayableTrack { snippet_seconds: u32 },

    #[error("track `{uri}` is shorter than the {snippet_seconds}s snippet")]
    TrackTooShort { uri: String, snippet_seconds: u32 },
}

impl RoundError {
    /// The track could not be played in full, but another track might.
    pub fn skips_track(&self) -> bool {
        matches!(
            self,
            RoundError::PlaybackUnavailable(PlaybackError::SnippetWindow { .. })
                | RoundError::TrackTooShort { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no playback device found; open your player on any device and try again")]
    NoDevice,

    #[error("could not start `{uri}` with enough time left for the full snippet")]
    SnippetWindow { uri: String },

    #[error("`{0}` is not a local file uri")]
    UnsupportedUri(String),

    #[error("audio output: {0}")]
    Audio(String),

    #[error("audio thread is gone")]
    Disconnected,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failures talking to the Spotify Web API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(
        "not signed in to Spotify (run `tunequiz --login`, or set spotify.access_token or SPOTIFY_ACCESS_TOKEN)"
    )]
    MissingToken,

    #[error("Spotify app credentials missing (set SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET and SPOTIFY_REDIRECT_URI)")]
    MissingCredentials,

    #[error("sign-in failed: {0}")]
    Auth(String),

    #[error("token cache at {path}: {source}")]
    TokenCache {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("token cache encode: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spotify returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library io at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("library cache encode: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encode: {0}")]
    Json(#[from] serde_json::Error),
}
