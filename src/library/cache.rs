//! On-disk snapshot of the Spotify saved-tracks library.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::LibraryError;

use super::model::{Track, normalize_track};

#[derive(Serialize)]
struct CacheFile<'a> {
    synced_at_utc: DateTime<Utc>,
    track_count: usize,
    tracks: &'a [Track],
}

/// Read the cache. A missing or unreadable cache yields an empty library so
/// the caller falls through to a fresh sync.
///
/// Accepts `{ "tracks": [...] }` or a bare list; entries may be tracks or
/// saved-track items wrapping one under `"track"`.
pub fn load_cache(path: &Path) -> Vec<Track> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    let payload: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("[Library] ignoring corrupt cache {}: {e}", path.display());
            return Vec::new();
        }
    };

    let entries = match &payload {
        Value::Object(obj) => obj.get("tracks").and_then(Value::as_array),
        Value::Array(list) => Some(list),
        _ => None,
    };

    entries
        .map(|list| {
            list.iter()
                .filter_map(|entry| normalize_track(entry.get("track").unwrap_or(entry)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn save_cache(path: &Path, tracks: &[Track]) -> Result<(), LibraryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| LibraryError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let payload = CacheFile {
        synced_at_utc: Utc::now(),
        track_count: tracks.len(),
        tracks,
    };
    let body = serde_json::to_string(&payload)?;
    fs::write(path, body).map_err(|source| LibraryError::Io {
        path: path.display().to_string(),
        source,
    })
}
