//! Timed round engine: candidate selection, the countdown, key capture and
//! the resolver that races them into a single outcome.

mod clock;
mod input;
mod resolver;
mod select;
mod types;

pub use clock::{MonotonicTime, TimeSource};
pub use input::{Key, KeySource, TerminalKeys};
pub use resolver::{RoundContext, RoundView, play_round};
pub use select::CandidateSelector;
pub use types::*;
