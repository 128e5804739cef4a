use std::path::PathBuf;

use crate::error::LibraryError;
use crate::spotify::SpotifyClient;

use super::LibraryProvider;
use super::cache::{load_cache, save_cache};
use super::model::{Track, dedupe_by_uri, normalize_track};

/// Saved tracks of a Spotify account, served from the local cache unless a
/// refresh is requested or the cache is empty.
pub struct SpotifyLibrary<'a> {
    client: &'a SpotifyClient,
    cache_path: PathBuf,
    refresh: bool,
}

impl<'a> SpotifyLibrary<'a> {
    pub fn new(client: &'a SpotifyClient, cache_path: PathBuf, refresh: bool) -> Self {
        Self {
            client,
            cache_path,
            refresh,
        }
    }

    /// Page through every saved track, then de-duplicate by uri.
    pub fn fetch_all(&self) -> Result<Vec<Track>, LibraryError> {
        let mut tracks: Vec<Track> = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.client.saved_tracks(offset)?;
            if page.items.is_empty() {
                break;
            }

            offset += page.items.len();
            tracks.extend(
                page.items
                    .iter()
                    .filter_map(|item| item.get("track"))
                    .filter_map(normalize_track),
            );
            log::debug!("[Library] synced {} tracks so far", tracks.len());

            if page.next.is_none() {
                break;
            }
        }

        Ok(dedupe_by_uri(tracks))
    }
}

impl LibraryProvider for SpotifyLibrary<'_> {
    fn get_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        if !self.refresh {
            let cached = load_cache(&self.cache_path);
            if !cached.is_empty() {
                log::info!(
                    "[Library] loaded {} tracks from {}",
                    cached.len(),
                    self.cache_path.display()
                );
                return Ok(cached);
            }
        }

        log::info!("[Library] refreshing saved tracks from Spotify");
        let tracks = self.fetch_all()?;
        save_cache(&self.cache_path, &tracks)?;
        log::info!(
            "[Library] saved {} tracks to {}",
            tracks.len(),
            self.cache_path.display()
        );
        Ok(tracks)
    }
}
