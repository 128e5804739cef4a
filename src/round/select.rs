//! Candidate selection: one correct track plus distinct distractors.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom, index};

use crate::error::RoundError;
use crate::library::{Track, dedupe_by_uri};

use super::types::Round;

/// A de-duplicated library ready to produce rounds.
pub struct CandidateSelector {
    pool: Vec<Track>,
    option_count: usize,
}

impl CandidateSelector {
    /// Fails with `InsufficientLibrary` when fewer than `option_count`
    /// distinct uris remain after de-duplication.
    pub fn new(library: Vec<Track>, option_count: usize) -> Result<Self, RoundError> {
        let pool = dedupe_by_uri(library);
        if pool.len() < option_count {
            return Err(RoundError::InsufficientLibrary {
                required: option_count,
                available: pool.len(),
            });
        }
        Ok(Self { pool, option_count })
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Draw the correct track uniformly among tracks long enough for the
    /// snippet, then build its round.
    pub fn pick<R: Rng + ?Sized>(&self, snippet_ms: u64, rng: &mut R) -> Result<Round, RoundError> {
        let eligible: Vec<&Track> = self
            .pool
            .iter()
            .filter(|t| t.duration_ms >= snippet_ms)
            .collect();
        let correct = eligible
            .choose(rng)
            .copied()
            .ok_or(RoundError::NoPlayableTrack {
                snippet_seconds: (snippet_ms / 1000) as u32,
            })?;
        self.build_with(correct, rng)
    }

    /// Build a round around a pre-chosen correct track: sample distractors
    /// without replacement from the rest of the pool, then shuffle.
    pub fn build_with<R: Rng + ?Sized>(
        &self,
        correct: &Track,
        rng: &mut R,
    ) -> Result<Round, RoundError> {
        let others: Vec<&Track> = self
            .pool
            .iter()
            .filter(|t| t.uri != correct.uri)
            .collect();
        let needed = self.option_count - 1;
        if others.len() < needed {
            return Err(RoundError::InsufficientLibrary {
                required: self.option_count,
                available: others.len() + 1,
            });
        }

        let mut tracks: Vec<Track> = index::sample(rng, others.len(), needed)
            .into_iter()
            .map(|i| others[i].clone())
            .collect();
        tracks.push(correct.clone());
        tracks.shuffle(rng);

        Ok(Round::new(tracks, correct.uri.clone()))
    }
}
