use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One playable track. Identity is `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
}

impl Track {
    /// Artists joined for display.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Build a `Track` from a loosely-shaped JSON object (API item or cache entry).
///
/// Entries without a `uri` are dropped. Artists may be plain strings or
/// `{ "name": ... }` objects; an empty list becomes "Unknown Artist".
pub fn normalize_track(raw: &Value) -> Option<Track> {
    let obj = raw.as_object()?;

    let uri = obj
        .get("uri")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let name = match obj.get("name") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Unknown Track".to_string(),
        Some(other) => other.to_string(),
    };

    let mut artists: Vec<String> = obj
        .get("artists")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| match a {
                    Value::String(s) => Some(s.trim()),
                    Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::trim),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if artists.is_empty() {
        artists.push("Unknown Artist".to_string());
    }

    let duration_ms = obj.get("duration_ms").and_then(Value::as_u64).unwrap_or(0);

    Some(Track {
        uri,
        name,
        artists,
        duration_ms,
    })
}

/// Keep the first track for every `uri`, preserving order.
pub fn dedupe_by_uri(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<String> = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.uri.clone()))
        .collect()
}
