//! Keystroke capture for the answer race.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

/// Upper bound on keys drained in one tick, so a flood of input cannot
/// starve the countdown.
pub const MAX_KEYS_PER_TICK: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    /// Ctrl-C; raw mode delivers it as a key instead of a signal.
    Interrupt,
    Other,
}

/// Raw single-key capture that never blocks.
pub trait KeySource {
    /// At most one pending keypress, or `None` when nothing is waiting.
    fn poll_key(&mut self) -> io::Result<Option<Key>>;
}

/// Reads keys from the terminal through crossterm. Expects raw mode.
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> io::Result<Option<Key>> {
        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let mapped = match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Key::Interrupt
                }
                KeyCode::Char(c) => Key::Char(c),
                KeyCode::Enter => Key::Enter,
                KeyCode::Esc => Key::Esc,
                _ => Key::Other,
            };
            return Ok(Some(mapped));
        }
        Ok(None)
    }
}

/// What one key means during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Select(usize),
    Quit,
    OutOfRange(char),
    Noise,
}

pub fn classify(key: Key, option_count: usize) -> Signal {
    match key {
        Key::Interrupt | Key::Char('q') | Key::Char('Q') => Signal::Quit,
        Key::Char(c) => match c.to_digit(10) {
            Some(d) if (1..=option_count).contains(&(d as usize)) => Signal::Select(d as usize),
            Some(_) => Signal::OutOfRange(c),
            None => Signal::Noise,
        },
        Key::Enter | Key::Esc | Key::Other => Signal::Noise,
    }
}

/// Everything recognized during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub quit: bool,
    /// First in-range digit of the tick.
    pub selection: Option<usize>,
    /// First out-of-range digit of the tick.
    pub out_of_range: Option<char>,
}

/// Drains a `KeySource` once per tick and keeps a count of ignored keys.
pub struct InputListener<'a> {
    source: &'a mut dyn KeySource,
    option_count: usize,
    noise: usize,
}

impl<'a> InputListener<'a> {
    pub fn new(source: &'a mut dyn KeySource, option_count: usize) -> Self {
        Self {
            source,
            option_count,
            noise: 0,
        }
    }

    pub fn noise(&self) -> usize {
        self.noise
    }

    /// Throw away keys typed before the countdown started. Returns how many
    /// were dropped; they do not count as noise.
    pub fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        for _ in 0..MAX_KEYS_PER_TICK * 4 {
            match self.source.poll_key() {
                Ok(Some(_)) => dropped += 1,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("[Round] key read failed: {e}");
                    break;
                }
            }
        }
        dropped
    }

    /// Collect the keys pending right now. A read error ends the drain for
    /// this tick; the countdown still guarantees the round resolves.
    pub fn poll_tick(&mut self) -> TickInput {
        let mut input = TickInput::default();
        for _ in 0..MAX_KEYS_PER_TICK {
            let key = match self.source.poll_key() {
                Ok(Some(key)) => key,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("[Round] key read failed: {e}");
                    break;
                }
            };
            match classify(key, self.option_count) {
                Signal::Quit => input.quit = true,
                Signal::Select(i) => {
                    input.selection.get_or_insert(i);
                }
                Signal::OutOfRange(c) => {
                    self.noise += 1;
                    input.out_of_range.get_or_insert(c);
                }
                Signal::Noise => self.noise += 1,
            }
        }
        input
    }
}
