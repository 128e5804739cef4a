use std::time::Duration;

use crate::config::DigitPolicy;
use crate::library::Track;

/// Choices shown per round.
pub const OPTION_COUNT: usize = 4;

/// A track bound to its slot in one round's choice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub track: Track,
    /// 1-based, as typed by the player.
    pub display_index: usize,
}

/// One round's shuffled choices plus the uri of the right one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    options: Vec<AnswerOption>,
    correct_uri: String,
}

impl Round {
    /// Bind `tracks` to display slots in the given order.
    pub fn new(tracks: Vec<Track>, correct_uri: impl Into<String>) -> Self {
        let options = tracks
            .into_iter()
            .enumerate()
            .map(|(i, track)| AnswerOption {
                track,
                display_index: i + 1,
            })
            .collect();
        Self {
            options,
            correct_uri: correct_uri.into(),
        }
    }

    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    pub fn correct_uri(&self) -> &str {
        &self.correct_uri
    }

    pub fn correct(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.track.uri == self.correct_uri)
    }

    pub fn option(&self, display_index: usize) -> Option<&AnswerOption> {
        self.options
            .iter()
            .find(|o| o.display_index == display_index)
    }

    pub fn is_correct(&self, display_index: usize) -> bool {
        self.option(display_index)
            .is_some_and(|o| o.track.uri == self.correct_uri)
    }
}

/// Per-run round parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundConfig {
    pub snippet_seconds: u32,
    pub option_count: usize,
    /// Interval between poll/redraw/expiry passes.
    pub tick: Duration,
    pub out_of_range: DigitPolicy,
    /// Start positions tried before a track counts as unplayable.
    pub start_attempts: u32,
}

impl RoundConfig {
    pub fn new(snippet_seconds: u32) -> Self {
        Self {
            snippet_seconds: snippet_seconds.max(1),
            option_count: OPTION_COUNT,
            tick: Duration::from_millis(100),
            out_of_range: DigitPolicy::Ignore,
            start_attempts: 3,
        }
    }

    pub fn snippet(&self) -> Duration {
        Duration::from_secs(u64::from(self.snippet_seconds))
    }

    pub fn snippet_ms(&self) -> u64 {
        u64::from(self.snippet_seconds) * 1000
    }
}

/// How a round ended. Exactly one per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Answered { selected: usize, correct: bool },
    Timeout,
    Quit,
    Invalid(String),
}

/// What the view needs to draw one countdown frame.
#[derive(Debug, Clone, Copy)]
pub struct RoundSnapshot<'a> {
    pub remaining: Duration,
    pub score: u32,
    pub options: &'a [AnswerOption],
    /// Unrecognized keys seen so far this round.
    pub noise: usize,
}

impl RoundSnapshot<'_> {
    /// Whole seconds left, rounded up so `00` only shows at expiry.
    pub fn remaining_seconds(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}
