//! Minimal blocking client for the Spotify Web API endpoints the game uses:
//! saved tracks, devices, start/pause playback and the current playback state.

use std::cell::RefCell;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::SpotifySettings;
use crate::error::ApiError;

pub mod auth;

pub use auth::Auth;

/// Spotify's maximum page size for saved tracks.
pub const SAVED_TRACKS_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub struct SavedTracksPage {
    #[serde(default)]
    pub items: Vec<Value>,
    pub next: Option<String>,
}

/// What the account is playing right now, reduced to what snippet checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub uri: String,
    pub duration_ms: u64,
    pub progress_ms: u64,
}

impl NowPlaying {
    pub fn remaining_ms(&self) -> u64 {
        self.duration_ms.saturating_sub(self.progress_ms)
    }

    /// Parse the `GET /me/player` body. `None` when nothing usable is playing.
    pub fn from_state(state: &Value) -> Option<Self> {
        let item = state.get("item")?;
        Some(Self {
            uri: item.get("uri")?.as_str()?.to_string(),
            duration_ms: item.get("duration_ms")?.as_u64()?,
            progress_ms: state.get("progress_ms")?.as_u64()?,
        })
    }
}

pub struct SpotifyClient {
    http: Client,
    api_base: String,
    auth: RefCell<Auth>,
}

/// HTTP client with the configured request timeout.
pub fn http_client(settings: &SpotifySettings) -> Result<Client, ApiError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
        .build()?)
}

impl SpotifyClient {
    pub fn new(settings: &SpotifySettings, auth: Auth) -> Result<Self, ApiError> {
        Ok(Self {
            http: http_client(settings)?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            auth: RefCell::new(auth),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.auth.borrow_mut().bearer(&self.http, Utc::now())?;
        let response = req.bearer_auth(token).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().unwrap_or(Value::Null);
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
            .to_string();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Display name (or id) of the authenticated account.
    pub fn current_user(&self) -> Result<String, ApiError> {
        let profile: Value = self.send(self.http.get(self.url("/me")))?.json()?;
        let name = profile
            .get("display_name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| profile.get("id").and_then(Value::as_str))
            .unwrap_or("unknown");
        Ok(name.to_string())
    }

    pub fn saved_tracks(&self, offset: usize) -> Result<SavedTracksPage, ApiError> {
        let req = self.http.get(self.url("/me/tracks")).query(&[
            ("limit", SAVED_TRACKS_PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ]);
        Ok(self.send(req)?.json()?)
    }

    pub fn devices(&self) -> Result<Vec<Device>, ApiError> {
        let list: DeviceList = self
            .send(self.http.get(self.url("/me/player/devices")))?
            .json()?;
        Ok(list.devices)
    }

    pub fn transfer_playback(&self, device_id: &str) -> Result<(), ApiError> {
        let body = json!({ "device_ids": [device_id], "play": false });
        self.send(self.http.put(self.url("/me/player")).json(&body))?;
        Ok(())
    }

    pub fn start_playback(
        &self,
        device_id: &str,
        uri: &str,
        position_ms: u64,
    ) -> Result<(), ApiError> {
        let body = json!({ "uris": [uri], "position_ms": position_ms });
        let req = self
            .http
            .put(self.url("/me/player/play"))
            .query(&[("device_id", device_id)])
            .json(&body);
        self.send(req)?;
        Ok(())
    }

    /// Pause on `device_id`, or on whatever device is active when `None`.
    pub fn pause_playback(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut req = self.http.put(self.url("/me/player/pause"));
        if let Some(id) = device_id {
            req = req.query(&[("device_id", id)]);
        }
        self.send(req)?;
        Ok(())
    }

    pub fn now_playing(&self) -> Result<Option<NowPlaying>, ApiError> {
        let response = self.send(self.http.get(self.url("/me/player")))?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let state: Value = response.json()?;
        Ok(NowPlaying::from_state(&state))
    }
}

/// Pick a device to play on: the previous one if still usable, then the active
/// unrestricted one, then any unrestricted one.
pub fn choose_device(devices: &[Device], preferred: Option<&str>) -> Option<String> {
    let usable = |d: &&Device| !d.is_restricted && d.id.is_some();

    if let Some(pref) = preferred {
        if devices
            .iter()
            .filter(usable)
            .any(|d| d.id.as_deref() == Some(pref))
        {
            return Some(pref.to_string());
        }
    }

    devices
        .iter()
        .filter(usable)
        .find(|d| d.is_active)
        .or_else(|| devices.iter().find(usable))
        .and_then(|d| d.id.clone())
}
