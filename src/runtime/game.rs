//! The run loop: rounds until the scorer says stop, then the game-over
//! screen and the replay prompt.

use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::{Terminal, backend::Backend};

use crate::config::{RoundSettings, Settings, UiSettings};
use crate::history::{History, RunRecord};
use crate::playback::PlaybackController;
use crate::round::{
    CandidateSelector, Key, KeySource, RoundConfig, RoundContext, RoundOutcome, RoundSnapshot,
    RoundView, TimeSource, play_round,
};
use crate::score::{EndReason, RunSummary, Scorer, Verdict};
use crate::ui::{self, GameOver};

const PROMPT_POLL: Duration = Duration::from_millis(50);

/// Tracks in a row that may be skipped for not fitting a full snippet
/// before the run gives up.
const MAX_SKIPPED_TRACKS: u32 = 5;

pub fn round_config(settings: &RoundSettings) -> RoundConfig {
    RoundConfig {
        tick: Duration::from_millis(settings.tick_ms),
        out_of_range: settings.out_of_range_digits,
        ..RoundConfig::new(settings.snippet_seconds)
    }
}

/// Draws each countdown frame into the terminal.
pub struct TerminalView<'t, B: Backend> {
    terminal: &'t mut Terminal<B>,
    ui: &'t UiSettings,
}

impl<'t, B: Backend> TerminalView<'t, B> {
    pub fn new(terminal: &'t mut Terminal<B>, ui: &'t UiSettings) -> Self {
        Self { terminal, ui }
    }
}

impl<B: Backend> RoundView for TerminalView<'_, B> {
    fn render(&mut self, snapshot: &RoundSnapshot<'_>) {
        let settings = self.ui;
        if let Err(e) = self.terminal.draw(|f| ui::draw_round(f, snapshot, settings)) {
            log::warn!("[Main] redraw failed: {e}");
        }
    }
}

/// How one run ended, plus what the game-over screen should say about it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub ended_at: DateTime<Utc>,
    pub answer: Option<String>,
    pub note: Option<String>,
}

/// Play rounds until one ends the run. A track that cannot fit a full
/// snippet is swapped for a fresh round; any other start failure ends the
/// run with `EndReason::Error`.
pub fn play_run<R: Rng + ?Sized>(
    selector: &CandidateSelector,
    config: &RoundConfig,
    max_rounds: u32,
    ctx: &mut RoundContext<'_>,
    rng: &mut R,
    started_at: DateTime<Utc>,
) -> RunReport {
    let t0 = ctx.time.now();
    let mut scorer = Scorer::new(max_rounds, started_at);
    let mut answer = None;
    let mut note = None;
    let mut skipped = 0;

    let reason = loop {
        let played = selector.pick(config.snippet_ms(), rng).and_then(|round| {
            let outcome = play_round(&round, config, scorer.state().score, ctx, rng)?;
            Ok((round, outcome))
        });
        let (round, outcome) = match played {
            Ok(played) => {
                skipped = 0;
                played
            }
            Err(e) if e.skips_track() && skipped < MAX_SKIPPED_TRACKS => {
                skipped += 1;
                log::warn!("[Main] skipping track: {e}");
                continue;
            }
            Err(e) => {
                log::error!("[Main] round could not start: {e}");
                note = Some(e.to_string());
                break EndReason::Error;
            }
        };

        if let Verdict::End(reason) = scorer.apply(&outcome) {
            if reason.reveals_answer() {
                answer = round
                    .correct()
                    .map(|o| format!("{} by {}", o.track.name, o.track.artist_line()));
            }
            if let RoundOutcome::Invalid(why) = &outcome {
                note = Some(why.clone());
            }
            break reason;
        }
    };

    let elapsed = ctx.time.now().saturating_sub(t0);
    let ended_at =
        started_at + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero());
    let summary = scorer.summarize(reason, ended_at);
    log::info!(
        "[Main] run over: score {} in {} rounds ({})",
        summary.score,
        summary.rounds_played,
        reason.as_str()
    );
    RunReport {
        summary,
        ended_at,
        answer,
        note,
    }
}

/// Throw away keys typed before the prompt was on screen.
fn drain_pending(keys: &mut dyn KeySource) -> io::Result<()> {
    for _ in 0..64 {
        if keys.poll_key()?.is_none() {
            break;
        }
    }
    Ok(())
}

/// Block until the player picks: `true` to play again, `false` to leave.
pub fn wait_for_replay(keys: &mut dyn KeySource, time: &dyn TimeSource) -> io::Result<bool> {
    loop {
        match keys.poll_key()? {
            Some(Key::Char('r' | 'R' | 'y' | 'Y') | Key::Enter) => return Ok(true),
            Some(Key::Char('q' | 'Q' | 'n' | 'N') | Key::Esc | Key::Interrupt) => return Ok(false),
            _ => time.sleep(PROMPT_POLL),
        }
    }
}

/// Runs back to back until the player declines a replay. Every run is
/// appended to the history. Returns the last run's summary.
pub fn run_session<B: Backend>(
    terminal: &mut Terminal<B>,
    settings: &Settings,
    selector: &CandidateSelector,
    playback: &mut dyn PlaybackController,
    keys: &mut dyn KeySource,
    time: &dyn TimeSource,
) -> io::Result<Option<RunSummary>> {
    let config = round_config(&settings.round);
    let history = History::new(settings.history_path());
    log::debug!("[History] using {}", history.path().display());
    let mut rng = match settings.round.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut last = None;
    loop {
        let previous_high = history.high_score();
        let started_at = Utc::now();

        let report = {
            let mut view = TerminalView::new(&mut *terminal, &settings.ui);
            let mut ctx = RoundContext {
                playback: &mut *playback,
                keys: &mut *keys,
                time,
                view: &mut view,
            };
            play_run(
                selector,
                &config,
                settings.round.max_rounds,
                &mut ctx,
                &mut rng,
                started_at,
            )
        };

        let record = RunRecord::from_summary(
            &report.summary,
            report.ended_at,
            selector.len(),
            config.snippet_seconds,
        );
        if let Err(e) = history.append(&record) {
            log::warn!("[History] could not record run: {e}");
        }

        let game_over = GameOver {
            score: report.summary.score,
            rounds_played: report.summary.rounds_played,
            duration: report.summary.duration,
            reason: report.summary.ended_reason,
            previous_high,
            answer: report.answer,
            note: report.note,
        };
        terminal
            .draw(|f| ui::draw_game_over(f, &game_over, &settings.ui))
            .map_err(|e| io::Error::other(e.to_string()))?;
        last = Some(report.summary);

        drain_pending(keys)?;
        if !wait_for_replay(keys, time)? {
            break;
        }
        log::info!("[Main] starting another run");
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use chrono::TimeZone;
    use ratatui::backend::TestBackend;
    use tempfile::tempdir;

    use super::*;
    use crate::round::OPTION_COUNT;
    use crate::testing::{FakePlayback, ManualTime, RecordingView, ScriptedKeys, library};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap()
    }

    fn selector() -> CandidateSelector {
        CandidateSelector::new(library(&["a", "b", "c", "d", "e"]), OPTION_COUNT).unwrap()
    }

    /// Always presses the digit of the `long` track, one tick after seeing it.
    struct Oracle {
        answer: Rc<Cell<Option<usize>>>,
    }

    impl RoundView for Oracle {
        fn render(&mut self, snapshot: &RoundSnapshot<'_>) {
            let idx = snapshot
                .options
                .iter()
                .find(|o| o.track.uri == "long")
                .map(|o| o.display_index);
            self.answer.set(idx);
        }
    }

    struct OracleKeys {
        answer: Rc<Cell<Option<usize>>>,
    }

    impl KeySource for OracleKeys {
        fn poll_key(&mut self) -> io::Result<Option<Key>> {
            Ok(self
                .answer
                .take()
                .and_then(|i| char::from_digit(i as u32, 10))
                .map(Key::Char))
        }
    }

    #[test]
    fn quitting_ends_the_run_without_revealing() {
        let time = ManualTime::default();
        let mut keys = ScriptedKeys::chars(&time, &[(300, 'q')]);
        let mut playback = FakePlayback::default();
        let mut view = RecordingView::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ctx = RoundContext {
            playback: &mut playback,
            keys: &mut keys,
            time: &time,
            view: &mut view,
        };
        let report = play_run(&selector(), &RoundConfig::new(5), 0, &mut ctx, &mut rng, t0());
        assert_eq!(report.summary.ended_reason, EndReason::Quit);
        assert_eq!(report.summary.rounds_played, 1);
        assert_eq!(report.summary.duration, Duration::from_millis(300));
        assert_eq!(report.ended_at, t0() + chrono::Duration::milliseconds(300));
        assert!(report.answer.is_none());
        assert_eq!(playback.pauses, 1);
    }

    #[test]
    fn timeout_reveals_the_answer() {
        let time = ManualTime::default();
        let mut keys = ScriptedKeys::silent(&time);
        let mut playback = FakePlayback::default();
        let mut view = RecordingView::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ctx = RoundContext {
            playback: &mut playback,
            keys: &mut keys,
            time: &time,
            view: &mut view,
        };
        let report = play_run(&selector(), &RoundConfig::new(1), 0, &mut ctx, &mut rng, t0());
        assert_eq!(report.summary.ended_reason, EndReason::Timeout);
        let uri = &playback.starts[0].0;
        assert_eq!(
            report.answer.as_deref(),
            Some(format!("Song {uri} by Artist {uri}").as_str())
        );
    }

    #[test]
    fn correct_answers_run_to_the_round_limit() {
        let mut tracks = library(&["long", "a", "b", "c", "d"]);
        for t in tracks.iter_mut().skip(1) {
            t.duration_ms = 2_000;
        }
        let selector = CandidateSelector::new(tracks, OPTION_COUNT).unwrap();
        let answer = Rc::new(Cell::new(None));
        let time = ManualTime::default();
        let mut keys = OracleKeys {
            answer: answer.clone(),
        };
        let mut view = Oracle { answer };
        let mut playback = FakePlayback::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut ctx = RoundContext {
            playback: &mut playback,
            keys: &mut keys,
            time: &time,
            view: &mut view,
        };
        let report = play_run(&selector, &RoundConfig::new(5), 3, &mut ctx, &mut rng, t0());
        assert_eq!(report.summary.ended_reason, EndReason::RoundLimit);
        assert_eq!(report.summary.score, 3);
        assert_eq!(playback.starts.len(), 3);
        assert_eq!(playback.pauses, 3);
    }

    #[test]
    fn playback_failure_ends_the_run_as_an_error() {
        let time = ManualTime::default();
        let mut keys = ScriptedKeys::silent(&time);
        let mut playback = FakePlayback {
            fail_start: true,
            ..FakePlayback::default()
        };
        let mut view = RecordingView::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ctx = RoundContext {
            playback: &mut playback,
            keys: &mut keys,
            time: &time,
            view: &mut view,
        };
        let report = play_run(&selector(), &RoundConfig::new(5), 0, &mut ctx, &mut rng, t0());
        assert_eq!(report.summary.ended_reason, EndReason::Error);
        assert_eq!(report.summary.rounds_played, 0);
        assert!(report.note.unwrap().starts_with("playback unavailable"));
        assert_eq!(playback.pauses, 0);
    }

    #[test]
    fn unplayable_track_is_swapped_for_a_new_round() {
        let time = ManualTime::default();
        let mut keys = ScriptedKeys::chars(&time, &[(300, 'q')]);
        let config = RoundConfig::new(5);
        let mut playback = FakePlayback {
            window_misses: config.start_attempts as usize,
            ..FakePlayback::default()
        };
        let mut view = RecordingView::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ctx = RoundContext {
            playback: &mut playback,
            keys: &mut keys,
            time: &time,
            view: &mut view,
        };
        let report = play_run(&selector(), &config, 0, &mut ctx, &mut rng, t0());
        assert_eq!(report.summary.ended_reason, EndReason::Quit);
        assert_eq!(report.summary.rounds_played, 1);
        assert_eq!(playback.missed.len(), config.start_attempts as usize);
        assert_eq!(playback.starts.len(), 1);
        assert_eq!(playback.pauses, 1);
    }

    #[test]
    fn endless_short_windows_eventually_end_the_run() {
        let time = ManualTime::default();
        let mut keys = ScriptedKeys::silent(&time);
        let config = RoundConfig::new(5);
        let mut playback = FakePlayback {
            window_misses: usize::MAX,
            ..FakePlayback::default()
        };
        let mut view = RecordingView::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ctx = RoundContext {
            playback: &mut playback,
            keys: &mut keys,
            time: &time,
            view: &mut view,
        };
        let report = play_run(&selector(), &config, 0, &mut ctx, &mut rng, t0());
        assert_eq!(report.summary.ended_reason, EndReason::Error);
        assert_eq!(report.summary.rounds_played, 0);
        assert_eq!(
            playback.missed.len(),
            ((MAX_SKIPPED_TRACKS + 1) * config.start_attempts) as usize
        );
        assert!(report.note.unwrap().contains("enough time left"));
    }

    #[test]
    fn replay_prompt_keys() {
        let time = ManualTime::default();
        let mut keys = ScriptedKeys::new(&time, vec![(0, Key::Char('x')), (200, Key::Enter)]);
        assert!(wait_for_replay(&mut keys, &time).unwrap());
        assert_eq!(time.now(), Duration::from_millis(200));

        let mut keys = ScriptedKeys::new(&time, vec![(300, Key::Esc)]);
        assert!(!wait_for_replay(&mut keys, &time).unwrap());
    }

    #[test]
    fn session_records_every_run_until_declined() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.history.path = Some(dir.path().join("game_history.jsonl"));
        settings.round.snippet_seconds = 5;
        settings.round.seed = Some(1);

        let time = ManualTime::default();
        let mut keys =
            ScriptedKeys::chars(&time, &[(100, 'q'), (500, 'y'), (1_000, 'q'), (2_000, 'n')]);
        let mut playback = FakePlayback::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        let last = run_session(
            &mut terminal,
            &settings,
            &selector(),
            &mut playback,
            &mut keys,
            &time,
        )
        .unwrap()
        .unwrap();
        assert_eq!(last.ended_reason, EndReason::Quit);
        assert_eq!(playback.starts.len(), 2);
        assert_eq!(playback.pauses, 2);

        let text = std::fs::read_to_string(settings.history_path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        let first: RunRecord = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first.end_reason, "quit");
        assert_eq!(first.library_size, 5);
        assert_eq!(first.snippet_seconds, 5);
    }

    #[test]
    fn round_config_follows_settings() {
        let mut settings = RoundSettings::default();
        settings.tick_ms = 250;
        settings.snippet_seconds = 8;
        settings.out_of_range_digits = crate::config::DigitPolicy::Invalid;
        let config = round_config(&settings);
        assert_eq!(config.tick, Duration::from_millis(250));
        assert_eq!(config.snippet_seconds, 8);
        assert_eq!(config.option_count, OPTION_COUNT);
        assert_eq!(config.out_of_range, crate::config::DigitPolicy::Invalid);
    }
}
