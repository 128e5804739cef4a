use std::{env, path::PathBuf};

use super::schema::Settings;
use crate::spotify::auth::Credentials;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then layers environment
/// variables (prefix `TUNEQUIZ__`) over it, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TUNEQUIZ")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.round.snippet_seconds == 0 {
            return Err("round.snippet_seconds must be >= 1".to_string());
        }
        if !(10..=1000).contains(&self.round.tick_ms) {
            return Err("round.tick_ms must be between 10 and 1000".to_string());
        }
        if self.playback.start_attempts == 0 {
            return Err("playback.start_attempts must be >= 1".to_string());
        }
        if self.ui.max_width < 40 {
            return Err("ui.max_width must be >= 40".to_string());
        }
        Ok(())
    }

    /// Run log location, `history.path` or the data-dir default.
    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("game_history.jsonl"))
    }

    /// Saved-tracks cache location, `library.cache_path` or the data-dir default.
    pub fn library_cache_path(&self) -> PathBuf {
        self.library
            .cache_path
            .clone()
            .unwrap_or_else(|| data_dir().join("library_data.json"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log
            .file
            .clone()
            .unwrap_or_else(|| data_dir().join("tunequiz.log"))
    }

    /// Access token from settings, or `SPOTIFY_ACCESS_TOKEN`.
    pub fn spotify_token(&self) -> Option<String> {
        setting_or_env(&self.spotify.access_token, &["SPOTIFY_ACCESS_TOKEN"])
    }

    /// App credentials from settings or the environment. `None` unless all
    /// three are known.
    pub fn spotify_credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            client_id: setting_or_env(
                &self.spotify.client_id,
                &["SPOTIFY_CLIENT_ID", "SPOTIPY_CLIENT_ID"],
            )?,
            client_secret: setting_or_env(
                &self.spotify.client_secret,
                &["SPOTIFY_CLIENT_SECRET", "SPOTIPY_CLIENT_SECRET"],
            )?,
            redirect_uri: setting_or_env(
                &self.spotify.redirect_uri,
                &["SPOTIFY_REDIRECT_URI", "SPOTIPY_REDIRECT_URI"],
            )?,
        })
    }

    pub fn token_cache_path(&self) -> PathBuf {
        self.spotify
            .token_cache
            .clone()
            .unwrap_or_else(|| data_dir().join("spotify_token.json"))
    }
}

/// A non-empty configured value, else the first non-empty variable of `vars`.
fn setting_or_env(configured: &str, vars: &[&str]) -> Option<String> {
    let configured = configured.trim();
    if !configured.is_empty() {
        return Some(configured.to_string());
    }
    vars.iter()
        .filter_map(|v| env::var(v).ok())
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
}

/// Resolve the config path from `TUNEQUIZ_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TUNEQUIZ_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/tunequiz/config.toml`
/// or `~/.config/tunequiz/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("tunequiz").join("config.toml"))
}

/// Directory for history, library cache and logs:
/// `$XDG_DATA_HOME/tunequiz`, `~/.local/share/tunequiz`, or the working directory.
pub fn data_dir() -> PathBuf {
    if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("tunequiz");
    }
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("tunequiz");
    }
    PathBuf::from(".")
}
