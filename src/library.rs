//! Track libraries: the read-only snapshot each run draws its rounds from.
//!
//! A library comes either from a directory of audio files or from the saved
//! tracks of a Spotify account (cached on disk between runs).

use std::path::PathBuf;

use crate::config::LibrarySettings;
use crate::error::LibraryError;

mod cache;
mod model;
mod scan;
mod spotify;

pub use model::{Track, dedupe_by_uri};
pub use scan::path_from_uri;
pub use spotify::SpotifyLibrary;

use scan::scan;

/// Source of the track snapshot for a run.
pub trait LibraryProvider {
    fn get_tracks(&self) -> Result<Vec<Track>, LibraryError>;
}

/// Audio files under a directory.
pub struct LocalLibrary {
    dir: PathBuf,
    settings: LibrarySettings,
}

impl LocalLibrary {
    pub fn new(dir: PathBuf, settings: LibrarySettings) -> Self {
        Self { dir, settings }
    }
}

impl LibraryProvider for LocalLibrary {
    fn get_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        let tracks = scan(&self.dir, &self.settings);
        log::info!(
            "[Library] found {} audio files under {}",
            tracks.len(),
            self.dir.display()
        );
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests;
