use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Position},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::composer::ComposerState;
use crate::core::constants::LOW_REMAINING_CHARS;
use crate::core::session::ChatSession;
use crate::ui::transcript_view::{build_lines, wrapped_height};

const MAX_INPUT_ROWS: u16 = 6;

/// View-only state the session knows nothing about.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Rows scrolled up from the bottom of the transcript.
    pub scroll_back: u16,
    pub pulse_start: Instant,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scroll_back: 0,
            pulse_start: Instant::now(),
        }
    }
}

impl ViewState {
    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }

    pub fn follow_tail(&mut self) {
        self.scroll_back = 0;
    }
}

pub fn title_text(session: &ChatSession) -> String {
    format!(
        "Causerie v{} - {} • {}",
        env!("CARGO_PKG_VERSION"),
        session.composer().selected_model().unwrap_or("no model"),
        session.channel_mode().label()
    )
}

fn wrapped_input_lines(input: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = input
        .split('\n')
        .map(|line| UnicodeWidthStr::width(line).div_ceil(width).max(1))
        .sum();
    rows.min(usize::from(u16::MAX)) as u16
}

fn input_rows(input: &str, width: u16) -> u16 {
    wrapped_input_lines(input, width).clamp(1, MAX_INPUT_ROWS)
}

fn input_title(state: ComposerState) -> &'static str {
    match state {
        ComposerState::Editing => "Enter send • Ctrl+J newline • Tab model • Ctrl+L log out • Esc quit",
        ComposerState::Sending => "Waiting for the reply (Esc to quit)",
        ComposerState::Disabled => "No model selected (Tab to pick one, Esc to quit)",
    }
}

fn counter(session: &ChatSession) -> Line<'static> {
    let composer = session.composer();
    let remaining = composer.remaining_chars();
    let style = if remaining < LOW_REMAINING_CHARS {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Line::from(Span::styled(
        format!(" {remaining}/{} ", composer.max_chars()),
        style,
    ))
    .right_aligned()
}

pub fn ui(f: &mut Frame, session: &ChatSession, view: &ViewState) {
    let area = f.area();
    let input_width = area.width.saturating_sub(2);
    let composer = session.composer();
    let notice_height = u16::from(session.notice().is_some());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(notice_height),
            Constraint::Length(input_rows(composer.input(), input_width) + 2),
        ])
        .split(area);

    let lines = build_lines(session, view.pulse_start.elapsed());
    let available_height = chunks[0].height.saturating_sub(1);
    let total = wrapped_height(&lines, chunks[0].width) as u16;
    let max_offset = total.saturating_sub(available_height);
    let scroll_offset = max_offset.saturating_sub(view.scroll_back);

    let messages = Paragraph::new(lines)
        .block(Block::default().title(title_text(session)))
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset, 0));
    f.render_widget(messages, chunks[0]);

    if let Some(notice) = session.notice() {
        let notice = Paragraph::new(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(Color::Yellow),
        )));
        f.render_widget(notice, chunks[1]);
    }

    let state = composer.state();
    let input_style = match state {
        ComposerState::Editing => Style::default().fg(Color::Cyan),
        ComposerState::Sending | ComposerState::Disabled => Style::default().fg(Color::DarkGray),
    };
    let input_rows_visible = chunks[2].height.saturating_sub(2);
    let input_total = wrapped_input_lines(composer.input(), input_width);
    let input_scroll = input_total.saturating_sub(input_rows_visible);

    let input = Paragraph::new(composer.input())
        .style(input_style)
        .wrap(Wrap { trim: false })
        .scroll((input_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(input_title(state))
                .title(counter(session)),
        );
    f.render_widget(input, chunks[2]);

    if state == ComposerState::Editing {
        let last_line = composer.input().rsplit('\n').next().unwrap_or_default();
        let width = input_width.max(1);
        let column = (UnicodeWidthStr::width(last_line) as u16) % width;
        let row = input_total
            .saturating_sub(1)
            .saturating_sub(input_scroll)
            .min(input_rows_visible.saturating_sub(1));
        f.set_cursor_position(Position::new(
            chunks[2].x + 1 + column,
            chunks[2].y + 1 + row,
        ));
    }
}
