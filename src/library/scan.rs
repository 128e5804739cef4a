use std::path::{Path, PathBuf};

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::Track;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Uri for a file on disk. Local playback maps it back with [`path_from_uri`].
pub fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

pub fn path_from_uri(uri: &str) -> Option<PathBuf> {
    uri.strip_prefix("file://")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Walk `dir` and turn every audio file into a `Track`, using tags when
/// they can be read and the file stem otherwise.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let mut name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown Track")
            .to_string();
        let mut artists: Vec<String> = Vec::new();
        let mut duration_ms = 0;

        match lofty::read_from_path(path) {
            Ok(tagged) => {
                duration_ms = tagged.properties().duration().as_millis() as u64;

                if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                    if let Some(v) = tag.title() {
                        if !v.trim().is_empty() {
                            name = v.trim().to_string();
                        }
                    }
                    if let Some(v) = tag.artist() {
                        artists = v
                            .split(['/', ';'])
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect();
                    }
                }
            }
            Err(e) => log::debug!("[Library] no tags for {}: {e}", path.display()),
        }

        if artists.is_empty() {
            artists.push("Unknown Artist".to_string());
        }

        tracks.push(Track {
            uri: file_uri(path),
            name,
            artists,
            duration_ms,
        });
    }

    tracks.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    tracks
}
