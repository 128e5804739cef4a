use super::cache::{load_cache, save_cache};
use super::model::normalize_track;
use super::*;
use crate::config::SpotifySettings;
use crate::spotify::{Auth, SpotifyClient};
use crate::testing::StubServer;
use serde_json::json;
use std::fs;

fn t(uri: &str, name: &str) -> Track {
    Track {
        uri: uri.into(),
        name: name.into(),
        artists: vec!["Someone".into()],
        duration_ms: 180_000,
    }
}

#[test]
fn normalize_track_accepts_api_shape() {
    let raw = json!({
        "uri": "spotify:track:1",
        "name": "Song",
        "artists": [{ "name": "A" }, { "name": "  " }, { "name": "B" }],
        "duration_ms": 201_000
    });
    let track = normalize_track(&raw).unwrap();
    assert_eq!(track.uri, "spotify:track:1");
    assert_eq!(track.name, "Song");
    assert_eq!(track.artists, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(track.duration_ms, 201_000);
    assert_eq!(track.artist_line(), "A, B");
}

#[test]
fn normalize_track_fills_defaults_and_drops_missing_uri() {
    let track = normalize_track(&json!({ "uri": "u", "artists": [], "duration_ms": "long" })).unwrap();
    assert_eq!(track.name, "Unknown Track");
    assert_eq!(track.artists, vec!["Unknown Artist".to_string()]);
    assert_eq!(track.duration_ms, 0);

    let plain = normalize_track(&json!({ "uri": "u", "artists": ["X", ""] })).unwrap();
    assert_eq!(plain.artists, vec!["X".to_string()]);

    assert!(normalize_track(&json!({ "name": "no uri" })).is_none());
    assert!(normalize_track(&json!({ "uri": "" })).is_none());
    assert!(normalize_track(&json!("not an object")).is_none());
}

#[test]
fn dedupe_keeps_first_occurrence_in_order() {
    let tracks = vec![t("a", "first"), t("b", "b"), t("a", "second"), t("c", "c")];
    let out = dedupe_by_uri(tracks);
    let uris: Vec<&str> = out.iter().map(|t| t.uri.as_str()).collect();
    assert_eq!(uris, vec!["a", "b", "c"]);
    assert_eq!(out[0].name, "first");
}

#[test]
fn cache_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library_data.json");
    let tracks = vec![t("a", "A"), t("b", "B")];

    save_cache(&path, &tracks).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["track_count"], 2);
    assert!(raw["synced_at_utc"].is_string());

    assert_eq!(load_cache(&path), tracks);
}

#[test]
fn load_cache_accepts_bare_lists_and_wrapped_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.json");
    fs::write(
        &path,
        r#"[{"track":{"uri":"a","name":"A","artists":[{"name":"X"}],"duration_ms":1000}},
           {"uri":"b","name":"B","artists":["Y"],"duration_ms":2000},
           {"name":"dropped"}]"#,
    )
    .unwrap();

    let tracks = load_cache(&path);
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].artists, vec!["X".to_string()]);
    assert_eq!(tracks[1].uri, "b");
}

#[test]
fn load_cache_treats_missing_or_corrupt_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_cache(&dir.path().join("missing.json")).is_empty());

    let path = dir.path().join("corrupt.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(load_cache(&path).is_empty());
}

#[test]
fn local_library_scans_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("one.mp3"), b"x").unwrap();
    fs::write(dir.path().join("two.flac"), b"x").unwrap();

    let lib = LocalLibrary::new(dir.path().to_path_buf(), LibrarySettings::default());
    assert_eq!(lib.get_tracks().unwrap().len(), 2);
}

fn saved(uri: &str, name: &str) -> serde_json::Value {
    json!({ "track": { "uri": uri, "name": name, "artists": [{ "name": "Band" }], "duration_ms": 200_000 } })
}

fn saved_tracks_api() -> StubServer {
    StubServer::start(|req| {
        if !req.is("GET", "/me/tracks") {
            return (404, json!({ "error": { "message": "unexpected" } }).to_string());
        }
        let page = if req.query.contains("offset=0") {
            json!({
                "items": [saved("spotify:track:1", "One"), saved("spotify:track:2", "Two")],
                "next": "https://api.spotify.com/v1/me/tracks?offset=2&limit=50"
            })
        } else {
            json!({
                "items": [saved("spotify:track:3", "Three"), saved("spotify:track:1", "One again")],
                "next": null
            })
        };
        (200, page.to_string())
    })
}

fn client_for(server: &StubServer) -> SpotifyClient {
    let settings = SpotifySettings {
        api_base: server.base.clone(),
        ..SpotifySettings::default()
    };
    SpotifyClient::new(&settings, Auth::Static("test-token".into())).unwrap()
}

#[test]
fn fetch_all_pages_until_next_is_null() {
    let server = saved_tracks_api();
    let client = client_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let lib = SpotifyLibrary::new(&client, dir.path().join("lib.json"), true);

    let tracks = lib.fetch_all().unwrap();
    let uris: Vec<&str> = tracks.iter().map(|t| t.uri.as_str()).collect();
    assert_eq!(uris, ["spotify:track:1", "spotify:track:2", "spotify:track:3"]);
    assert_eq!(tracks[0].name, "One");

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].query.contains("limit=50"));
    assert!(requests[1].query.contains("offset=2"));
}

#[test]
fn spotify_library_prefers_its_cache_unless_refreshing() {
    let server = saved_tracks_api();
    let client = client_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.json");

    // Empty cache: sync from the API and write it out.
    let synced = SpotifyLibrary::new(&client, path.clone(), false)
        .get_tracks()
        .unwrap();
    assert_eq!(synced.len(), 3);
    assert_eq!(load_cache(&path), synced);
    assert_eq!(server.count("GET", "/me/tracks"), 2);

    // Warm cache: no requests.
    let cached = SpotifyLibrary::new(&client, path.clone(), false)
        .get_tracks()
        .unwrap();
    assert_eq!(cached, synced);
    assert_eq!(server.count("GET", "/me/tracks"), 2);

    // Refresh ignores the cache.
    SpotifyLibrary::new(&client, path, true).get_tracks().unwrap();
    assert_eq!(server.count("GET", "/me/tracks"), 4);
}
