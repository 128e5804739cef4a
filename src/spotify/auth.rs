//! Spotify sign-in: the authorization-code flow, refresh grants and the
//! on-disk token cache.
//!
//! The cache keeps the same JSON shape other Spotify tools write
//! (`access_token`, `refresh_token`, `expires_at` in unix seconds), so an
//! existing `.spotifycache` can be reused as-is.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Scopes the game needs: read saved tracks, read and drive the player.
pub const SCOPE: &str = "user-library-read user-read-playback-state user-modify-playback-state";

/// Refresh this long before the reported expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_cached(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> CachedToken {
        CachedToken {
            access_token: self.access_token,
            // Refresh responses usually omit it; keep the one we had.
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + Duration::seconds(self.expires_in),
        }
    }
}

pub fn load_token_cache(path: &Path) -> Option<CachedToken> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(token) => Some(token),
        Err(e) => {
            log::warn!("[Auth] ignoring unreadable token cache {}: {e}", path.display());
            None
        }
    }
}

pub fn save_token_cache(path: &Path, token: &CachedToken) -> Result<(), ApiError> {
    let io_err = |source| ApiError::TokenCache {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let text = serde_json::to_string_pretty(token)?;
    fs::write(path, text).map_err(io_err)
}

/// Copy the first legacy cache that exists to `target`, unless `target`
/// already exists. Best-effort: failures only cost a fresh sign-in.
pub fn migrate_legacy_cache(target: &Path, legacy: &[PathBuf]) {
    if target.exists() {
        return;
    }
    let Some(old) = legacy.iter().find(|p| load_token_cache(p).is_some()) else {
        return;
    };
    if let Some(parent) = target.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match fs::copy(old, target) {
        Ok(_) => log::info!(
            "[Auth] moved token cache {} to {}",
            old.display(),
            target.display()
        ),
        Err(e) => log::debug!("[Auth] could not migrate {}: {e}", old.display()),
    }
}

/// Where to send the player to approve access.
pub fn authorize_url(credentials: &Credentials, accounts_base: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(&format!("{}/authorize", accounts_base.trim_end_matches('/')))
        .map_err(|e| ApiError::Auth(format!("bad accounts url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", &credentials.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &credentials.redirect_uri)
        .append_pair("scope", SCOPE);
    Ok(url)
}

/// Pull the `code` out of the address the browser was redirected to. A bare
/// code is accepted too.
pub fn code_from_redirect(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .filter(|c| !c.is_empty()),
        Err(_) if !input.contains(['?', '&', '=', '/']) => Some(input.to_string()),
        Err(_) => None,
    }
}

fn token_request(
    http: &Client,
    accounts_base: &str,
    credentials: &Credentials,
    form: &[(&str, &str)],
) -> Result<TokenResponse, ApiError> {
    let url = format!("{}/api/token", accounts_base.trim_end_matches('/'));
    let response = http
        .post(url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(form)
        .send()?;
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }
    let body: Value = response.json().unwrap_or(Value::Null);
    let message = body
        .get("error_description")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("token request failed"))
        .to_string();
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

pub fn exchange_code(
    http: &Client,
    accounts_base: &str,
    credentials: &Credentials,
    code: &str,
) -> Result<CachedToken, ApiError> {
    let response = token_request(
        http,
        accounts_base,
        credentials,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &credentials.redirect_uri),
        ],
    )?;
    Ok(response.into_cached(Utc::now(), None))
}

pub fn refresh(
    http: &Client,
    accounts_base: &str,
    credentials: &Credentials,
    refresh_token: &str,
) -> Result<CachedToken, ApiError> {
    let response = token_request(
        http,
        accounts_base,
        credentials,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )?;
    Ok(response.into_cached(Utc::now(), Some(refresh_token.to_string())))
}

/// Where the bearer token for API calls comes from.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Supplied as-is and used until Spotify rejects it.
    Static(String),
    /// Obtained by signing in; refreshed and re-cached when it runs out.
    Refreshing {
        credentials: Credentials,
        accounts_base: String,
        cache_path: PathBuf,
        token: CachedToken,
    },
}

impl Auth {
    /// Prefer a cached sign-in that can refresh itself, then a fixed token.
    pub fn resolve(
        credentials: Option<Credentials>,
        accounts_base: &str,
        cache_path: &Path,
        access_token: Option<String>,
    ) -> Result<Self, ApiError> {
        let cached = load_token_cache(cache_path);
        match (credentials, cached) {
            (Some(credentials), Some(token)) => Ok(Auth::Refreshing {
                credentials,
                accounts_base: accounts_base.to_string(),
                cache_path: cache_path.to_path_buf(),
                token,
            }),
            (None, Some(token)) if token.is_fresh(Utc::now()) && access_token.is_none() => {
                log::info!("[Auth] using cached token without app credentials; it will not refresh");
                Ok(Auth::Static(token.access_token))
            }
            _ => access_token.map(Auth::Static).ok_or(ApiError::MissingToken),
        }
    }

    /// Current bearer token, refreshing first when it is about to expire.
    pub fn bearer(&mut self, http: &Client, now: DateTime<Utc>) -> Result<String, ApiError> {
        match self {
            Auth::Static(token) => Ok(token.clone()),
            Auth::Refreshing {
                credentials,
                accounts_base,
                cache_path,
                token,
            } => {
                if !token.is_fresh(now) {
                    let refresh_token = token.refresh_token.clone().ok_or_else(|| {
                        ApiError::Auth("cached token expired and cannot be refreshed".into())
                    })?;
                    log::debug!("[Auth] access token expired, refreshing");
                    *token = refresh(http, accounts_base, credentials, &refresh_token)?;
                    if let Err(e) = save_token_cache(cache_path, token) {
                        log::warn!("[Auth] could not update token cache: {e}");
                    }
                }
                Ok(token.access_token.clone())
            }
        }
    }
}
