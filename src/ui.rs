//! UI rendering helpers for the terminal user interface.
//!
//! Pure drawing over `ratatui` frames; the game loop decides what to show.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::config::UiSettings;
use crate::round::{AnswerOption, RoundSnapshot};
use crate::score::EndReason;

/// Footer help for the answer screen.
fn controls_text(option_count: usize) -> String {
    format!("[1-{option_count}] answer | [q] quit")
}

const GAME_OVER_CONTROLS: &str = "[r/y/enter] play again | [q/n/esc] exit";

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn status_text(snapshot: &RoundSnapshot<'_>) -> String {
    let mut text = format!(
        "Score: {} • Time left: {:02}s",
        snapshot.score,
        snapshot.remaining_seconds()
    );
    if snapshot.noise > 0 {
        text.push_str(&format!(" • Ignored keys: {}", snapshot.noise));
    }
    text
}

/// `[i] name` with the artists on the next line.
fn option_item(option: &AnswerOption) -> ListItem<'_> {
    ListItem::new(vec![
        Line::from(vec![
            Span::styled(
                format!("[{}] ", option.display_index),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(option.track.name.as_str()),
        ]),
        Line::from(format!("    {}", option.track.artist_line())).dim(),
    ])
}

/// Horizontally centered column no wider than `max_width`.
fn content_area(area: Rect, max_width: u16) -> Rect {
    let width = area.width.min(max_width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn header(text: &str) -> Paragraph<'_> {
    Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" tunequiz ")
            .title_alignment(Alignment::Center),
    )
}

fn footer(text: String) -> Paragraph<'static> {
    Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true })
}

fn screen_chunks(frame: &Frame, ui: &UiSettings) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(content_area(frame.area(), ui.max_width))
}

/// Draw one countdown frame: header, status, the choices and controls.
pub fn draw_round(frame: &mut Frame, snapshot: &RoundSnapshot<'_>, ui: &UiSettings) {
    let chunks = screen_chunks(frame, ui);
    frame.render_widget(header(&ui.header_text), chunks[0]);

    let mut status = Paragraph::new(status_text(snapshot)).block(
        Block::bordered()
            .padding(Padding {
                left: 1,
                right: 0,
                top: 0,
                bottom: 0,
            })
            .title(" status "),
    );
    if snapshot.remaining_seconds() <= 3 {
        status = status.bold();
    }
    frame.render_widget(status, chunks[1]);

    let items: Vec<ListItem> = snapshot.options.iter().map(option_item).collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" which song is playing? "),
    );
    frame.render_widget(list, chunks[2]);

    frame.render_widget(footer(controls_text(snapshot.options.len())), chunks[3]);
}

/// Everything the end-of-run screen shows.
#[derive(Debug, Clone)]
pub struct GameOver {
    pub score: u32,
    pub rounds_played: u32,
    pub duration: Duration,
    pub reason: EndReason,
    /// Best score before this run started.
    pub previous_high: u32,
    /// `name by artists` for the track the player missed.
    pub answer: Option<String>,
    /// Extra line, e.g. why a round could not start.
    pub note: Option<String>,
}

impl GameOver {
    pub fn is_new_high(&self) -> bool {
        self.score > self.previous_high
    }

    fn headline(&self) -> &'static str {
        match self.reason {
            EndReason::Incorrect => "Wrong answer!",
            EndReason::Timeout => "Time's up!",
            EndReason::Quit => "Thanks for playing.",
            EndReason::Invalid => "That key isn't a choice.",
            EndReason::RoundLimit => "Round limit reached.",
            EndReason::Error => "The game stopped.",
        }
    }

    fn lines(&self) -> Vec<Line<'_>> {
        let mut lines = vec![Line::from(self.headline()).bold(), Line::default()];
        if let Some(answer) = &self.answer {
            lines.push(Line::from(format!("It was: {answer}")));
            lines.push(Line::default());
        }
        if let Some(note) = &self.note {
            lines.push(Line::from(note.as_str()).italic());
            lines.push(Line::default());
        }
        lines.push(Line::from(format!(
            "Final score: {}  ({} rounds in {})",
            self.score,
            self.rounds_played,
            format_mmss(self.duration)
        )));
        lines.push(Line::from(format!(
            "High score: {}",
            self.score.max(self.previous_high)
        )));
        if self.is_new_high() {
            lines.push(Line::from("*** New high score! ***").bold());
        }
        lines
    }
}

pub fn draw_game_over(frame: &mut Frame, game_over: &GameOver, ui: &UiSettings) {
    let chunks = screen_chunks(frame, ui);
    frame.render_widget(header(&ui.header_text), chunks[0]);

    let body_area = chunks[1].union(chunks[2]);
    let popup = centered_rect_sized(64, 12, body_area);
    frame.render_widget(Clear, popup);
    let body = Paragraph::new(game_over.lines())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" game over "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(body, popup);

    frame.render_widget(footer(GAME_OVER_CONTROLS.to_string()), chunks[3]);
}
