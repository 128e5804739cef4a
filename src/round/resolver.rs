//! The round state machine: start the snippet, race keys against the
//! countdown, settle on exactly one outcome, stop the snippet.
//!
//! Every tick runs the same fixed sequence (poll keys, redraw, check
//! expiry) so precedence is decided by data, never by scheduling:
//! quit beats an answer, an answer beats expiry, and a key that arrives in
//! the tick the clock runs out still counts.

use rand::Rng;

use crate::config::DigitPolicy;
use crate::error::{PlaybackError, RoundError};
use crate::playback::{PlaybackController, snippet_start_ms};

use super::clock::{RoundClock, TimeSource};
use super::input::{InputListener, KeySource, TickInput};
use super::types::{Round, RoundConfig, RoundOutcome, RoundSnapshot};

/// Receives one snapshot per tick. Rendering failures are the view's problem.
pub trait RoundView {
    fn render(&mut self, snapshot: &RoundSnapshot<'_>);
}

/// Collaborators a round borrows for its duration. The resolver is the only
/// caller of `playback` while a round is live.
pub struct RoundContext<'a> {
    pub playback: &'a mut dyn PlaybackController,
    pub keys: &'a mut dyn KeySource,
    pub time: &'a dyn TimeSource,
    pub view: &'a mut dyn RoundView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundState {
    WaitingForPlaybackStart,
    Racing,
    Resolved(RoundOutcome),
}

pub struct RoundResolver<'r> {
    round: &'r Round,
    config: &'r RoundConfig,
    state: RoundState,
}

impl<'r> RoundResolver<'r> {
    pub fn new(round: &'r Round, config: &'r RoundConfig) -> Self {
        Self {
            round,
            config,
            state: RoundState::WaitingForPlaybackStart,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    /// Drive the round to its outcome.
    ///
    /// Errors only before racing begins (no playable snippet, playback
    /// unavailable); in that case the controller has already stopped
    /// anything it started and the resolver does not pause.
    /// Once racing, the outcome is guaranteed and playback is paused exactly
    /// once, whatever the outcome.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut RoundContext<'_>,
        score: u32,
        rng: &mut R,
    ) -> Result<RoundOutcome, RoundError> {
        let correct = self
            .round
            .correct()
            .ok_or_else(|| RoundError::InsufficientLibrary {
                required: self.config.option_count,
                available: self.round.options().len(),
            })?;
        // Each attempt gets a fresh start position; only a too-short window
        // is worth another try.
        let mut attempt = 1;
        loop {
            let position_ms =
                snippet_start_ms(correct.track.duration_ms, self.config.snippet_ms(), rng)
                    .ok_or_else(|| RoundError::TrackTooShort {
                        uri: self.round.correct_uri().to_string(),
                        snippet_seconds: self.config.snippet_seconds,
                    })?;

            log::debug!(
                "[Round] starting {} at {position_ms}ms (attempt {attempt})",
                correct.track.uri
            );
            match ctx.playback.start(&correct.track.uri, position_ms) {
                Ok(_) => break,
                Err(PlaybackError::SnippetWindow { .. }) if attempt < self.config.start_attempts => {
                    log::debug!("[Round] snippet window too short, rerolling");
                    attempt += 1;
                }
                Err(e) => return Err(RoundError::PlaybackUnavailable(e)),
            }
        }

        let mut listener = InputListener::new(&mut *ctx.keys, self.config.option_count);
        let stale = listener.discard_pending();
        if stale > 0 {
            log::debug!("[Round] dropped {stale} keys typed before the countdown");
        }

        let clock = RoundClock::start(ctx.time, self.config.snippet());
        self.state = RoundState::Racing;

        let outcome = loop {
            let input = listener.poll_tick();
            ctx.view.render(&RoundSnapshot {
                remaining: clock.remaining(),
                score,
                options: self.round.options(),
                noise: listener.noise(),
            });
            if let Some(outcome) = self.settle(&input, clock.expired()) {
                break outcome;
            }
            clock.wait_tick(self.config.tick);
        };

        log::info!("[Round] resolved: {outcome:?}");
        self.state = RoundState::Resolved(outcome.clone());

        if let Err(e) = ctx.playback.pause() {
            log::warn!("[Round] pause after round failed: {e}");
        }

        Ok(outcome)
    }

    /// Apply the precedence rules to one tick's observations.
    pub fn settle(&self, input: &TickInput, expired: bool) -> Option<RoundOutcome> {
        if input.quit {
            return Some(RoundOutcome::Quit);
        }
        if let Some(selected) = input.selection {
            return Some(RoundOutcome::Answered {
                selected,
                correct: self.round.is_correct(selected),
            });
        }
        if let (Some(c), DigitPolicy::Invalid) = (input.out_of_range, self.config.out_of_range) {
            return Some(RoundOutcome::Invalid(format!(
                "`{c}` is not one of 1-{}",
                self.config.option_count
            )));
        }
        expired.then_some(RoundOutcome::Timeout)
    }
}

/// Play one round from playback start to resolution.
pub fn play_round<R: Rng + ?Sized>(
    round: &Round,
    config: &RoundConfig,
    score: u32,
    ctx: &mut RoundContext<'_>,
    rng: &mut R,
) -> Result<RoundOutcome, RoundError> {
    let mut resolver = RoundResolver::new(round, config);
    let result = resolver.run(ctx, score, rng);
    log::trace!("[Round] finished in {:?}", resolver.state());
    result
}
