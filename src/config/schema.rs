use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tunequiz/config.toml` or `~/.config/tunequiz/config.toml`
///
/// Precedence (highest wins):
/// 1) Command-line flags
/// 2) Environment variables (prefix `TUNEQUIZ__`, `__` as nested separator)
/// 3) Config file (if present)
/// 4) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub round: RoundSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub spotify: SpotifySettings,
    pub history: HistorySettings,
    pub ui: UiSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoundSettings {
    /// Length of each snippet, and of the answer window, in seconds.
    pub snippet_seconds: u32,
    /// Stop the run after this many correct answers. 0 means unlimited.
    pub max_rounds: u32,
    /// Countdown redraw/poll interval (milliseconds).
    pub tick_ms: u64,
    /// What a digit outside `1..=4` does while the countdown runs.
    pub out_of_range_digits: DigitPolicy,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            snippet_seconds: 15,
            max_rounds: 0,
            tick_ms: 100,
            out_of_range_digits: DigitPolicy::Ignore,
            seed: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigitPolicy {
    /// Treat the key like any other unrecognized key.
    #[serde(alias = "noise")]
    Ignore,
    /// End the round with an `Invalid` outcome.
    #[serde(alias = "resolve")]
    Invalid,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub backend: Backend,
    /// How many times a remote start is attempted before giving up.
    pub start_attempts: u32,
    /// Pause between failed remote start attempts (milliseconds).
    pub retry_delay_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            start_attempts: 3,
            retry_delay_ms: 400,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Audio files on disk, played through the default output device.
    #[serde(alias = "files")]
    Local,
    /// Saved tracks of a Spotify account, played on one of its devices.
    Spotify,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned by the local backend. Defaults to the working directory.
    pub dir: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Saved-tracks cache used by the Spotify backend.
    pub cache_path: Option<PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            dir: None,
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            cache_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotifySettings {
    pub api_base: String,
    /// Authorization server used by `--login` and token refreshes.
    pub accounts_base: String,
    /// App credentials from the Spotify developer dashboard. Fall back to
    /// `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET` / `SPOTIFY_REDIRECT_URI`
    /// (also read from a `.env` file in the working directory).
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_uri: String,
    /// Signed-in token cache. Defaults to `<data dir>/spotify_token.json`.
    pub token_cache: Option<PathBuf>,
    /// Fixed OAuth access token with the `user-library-read`,
    /// `user-read-playback-state` and `user-modify-playback-state` scopes.
    /// Used when there is no signed-in cache; falls back to
    /// `SPOTIFY_ACCESS_TOKEN` when empty.
    #[serde(skip_serializing)]
    pub access_token: String,
    pub request_timeout_secs: u64,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            accounts_base: "https://accounts.spotify.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            token_cache: None,
            access_token: String::new(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HistorySettings {
    /// JSON-lines run log. Defaults to `<data dir>/game_history.jsonl`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Option text wraps at this many columns even on wider terminals.
    pub max_width: u16,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ Name that tune ~ ".to_string(),
            max_width: 110,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log file. Defaults to `<data dir>/tunequiz.log`.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
