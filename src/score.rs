//! Run scoring: one strike ends the run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::round::RoundOutcome;

/// Score and round count for the run in progress. Only the `Scorer` mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub score: u32,
    pub rounds_played: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Incorrect,
    Timeout,
    Quit,
    Invalid,
    RoundLimit,
    /// A round could not start (playback or library failure).
    Error,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Incorrect => "incorrect",
            EndReason::Timeout => "timeout",
            EndReason::Quit => "quit",
            EndReason::Invalid => "invalid",
            EndReason::RoundLimit => "round_limit",
            EndReason::Error => "error",
        }
    }

    /// Whether the game-over screen should reveal the answer.
    pub fn reveals_answer(self) -> bool {
        matches!(self, EndReason::Incorrect | EndReason::Timeout | EndReason::Invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    End(EndReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub score: u32,
    pub rounds_played: u32,
    pub duration: Duration,
    pub ended_reason: EndReason,
    pub started_at: DateTime<Utc>,
}

impl RunSummary {
    /// Correct answers as a percentage of rounds played, 0 for an empty run.
    pub fn accuracy_pct(&self) -> f64 {
        if self.rounds_played == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.rounds_played) * 100.0
    }
}

pub struct Scorer {
    state: RunState,
    /// 0 means unlimited.
    max_rounds: u32,
}

impl Scorer {
    pub fn new(max_rounds: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            state: RunState {
                score: 0,
                rounds_played: 0,
                started_at,
            },
            max_rounds,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Fold one round's outcome into the run.
    pub fn apply(&mut self, outcome: &RoundOutcome) -> Verdict {
        self.state.rounds_played += 1;
        match outcome {
            RoundOutcome::Answered { correct: true, .. } => {
                self.state.score += 1;
                if self.max_rounds > 0 && self.state.rounds_played >= self.max_rounds {
                    Verdict::End(EndReason::RoundLimit)
                } else {
                    Verdict::Continue
                }
            }
            RoundOutcome::Answered { correct: false, .. } => Verdict::End(EndReason::Incorrect),
            RoundOutcome::Timeout => Verdict::End(EndReason::Timeout),
            RoundOutcome::Quit => Verdict::End(EndReason::Quit),
            RoundOutcome::Invalid(_) => Verdict::End(EndReason::Invalid),
        }
    }

    pub fn summarize(&self, reason: EndReason, ended_at: DateTime<Utc>) -> RunSummary {
        let duration = (ended_at - self.state.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        RunSummary {
            score: self.state.score,
            rounds_played: self.state.rounds_played,
            duration,
            ended_reason: reason,
            started_at: self.state.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn right() -> RoundOutcome {
        RoundOutcome::Answered {
            selected: 1,
            correct: true,
        }
    }

    #[test]
    fn correct_answers_keep_the_run_going() {
        let mut scorer = Scorer::new(0, t0());
        for _ in 0..5 {
            assert_eq!(scorer.apply(&right()), Verdict::Continue);
        }
        assert_eq!(scorer.state().score, 5);
        assert_eq!(scorer.state().rounds_played, 5);
    }

    #[test]
    fn any_miss_ends_the_run() {
        let cases = [
            (
                RoundOutcome::Answered {
                    selected: 2,
                    correct: false,
                },
                EndReason::Incorrect,
            ),
            (RoundOutcome::Timeout, EndReason::Timeout),
            (RoundOutcome::Quit, EndReason::Quit),
            (RoundOutcome::Invalid("`9`".into()), EndReason::Invalid),
        ];
        for (outcome, reason) in cases {
            let mut scorer = Scorer::new(0, t0());
            scorer.apply(&right());
            assert_eq!(scorer.apply(&outcome), Verdict::End(reason));
            assert_eq!(scorer.state().score, 1);
            assert_eq!(scorer.state().rounds_played, 2);
        }
    }

    #[test]
    fn round_cap_ends_after_a_correct_answer() {
        let mut scorer = Scorer::new(2, t0());
        assert_eq!(scorer.apply(&right()), Verdict::Continue);
        assert_eq!(scorer.apply(&right()), Verdict::End(EndReason::RoundLimit));
        assert_eq!(scorer.state().score, 2);
    }

    #[test]
    fn summary_reports_duration_and_accuracy() {
        let mut scorer = Scorer::new(0, t0());
        scorer.apply(&right());
        scorer.apply(&right());
        scorer.apply(&right());
        scorer.apply(&RoundOutcome::Timeout);
        let end = t0() + chrono::Duration::milliseconds(42_500);
        let summary = scorer.summarize(EndReason::Timeout, end);
        assert_eq!(summary.duration, Duration::from_millis(42_500));
        assert_eq!(summary.rounds_played, 4);
        assert!((summary.accuracy_pct() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_run_has_zero_accuracy() {
        let scorer = Scorer::new(0, t0());
        let summary = scorer.summarize(EndReason::Error, t0());
        assert_eq!(summary.accuracy_pct(), 0.0);
        assert_eq!(summary.duration, Duration::ZERO);
    }

    #[test]
    fn end_reason_names() {
        assert_eq!(EndReason::RoundLimit.as_str(), "round_limit");
        assert_eq!(
            serde_json::to_string(&EndReason::Incorrect).unwrap(),
            "\"incorrect\""
        );
        assert!(EndReason::Timeout.reveals_answer());
        assert!(!EndReason::Quit.reveals_answer());
    }
}
