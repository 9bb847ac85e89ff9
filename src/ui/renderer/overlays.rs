//! Popups and prompts: the kill confirmation, border prompts and the
//! terminal-too-small screen.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::constants::{
    KILL_POPUP_HEIGHT, KILL_POPUP_WIDTH, MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH,
};
use crate::ui::handlers::{EventHandler, KillTarget};
use crate::ui::state::UiState;
use crate::ui::theme::Theme;
use crate::utils::truncate_str;

use super::helpers::{centered_rect, put};

pub fn kill_question(target: &KillTarget) -> String {
    format!("Kill {} ({})?", target.pid, target.command)
}

/// What the bottom border of the process pane says.
pub fn prompt<'a>(state: &UiState, theme: &Theme) -> Line<'a> {
    let key = Style::default()
        .fg(theme.accent)
        .add_modifier(Modifier::BOLD);
    let text = theme.text_style();
    let dim = theme.dim_style();

    match &state.handler {
        EventHandler::Filter => Line::from(vec![
            Span::styled(" Filter: ", dim),
            Span::styled(format!("{}_", state.filter), text),
            Span::styled("  Enter", key),
            Span::styled(" done ", dim),
        ]),
        EventHandler::Kill(target) => Line::from(vec![
            Span::styled(format!(" {} ", kill_question(target)), text),
            Span::styled("k", key),
            Span::styled(" to confirm ", dim),
        ]),
        EventHandler::Base if !state.filter.is_empty() => Line::from(vec![
            Span::styled(" Filter: ", dim),
            Span::styled(state.filter.clone(), text),
            Span::styled("  /", key),
            Span::styled(" edit ", dim),
        ]),
        EventHandler::Base => {
            let mut spans = Vec::new();
            for (k, what) in [("/", "filter"), ("↑↓", "pick"), ("k", "kill"), ("q", "quit")] {
                spans.push(Span::styled(format!(" {}", k), key));
                spans.push(Span::styled(format!(" {}", what), dim));
            }
            spans.push(Span::raw(" "));
            Line::from(spans)
        }
    }
}

pub fn render_kill_modal(frame: &mut Frame, area: Rect, target: &KillTarget, theme: &Theme) {
    let popup_area = centered_rect(KILL_POPUP_WIDTH, KILL_POPUP_HEIGHT, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(
            " Kill process ",
            Style::default()
                .fg(theme.danger)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.danger));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let width = inner.width.saturating_sub(2) as usize;
    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled(
            format!(" {}", truncate_str(&kill_question(target), width)),
            theme.text_style().add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::from(vec![
            Span::styled(
                " k",
                Style::default()
                    .fg(theme.danger)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" confirm, any other key aborts", theme.dim_style()),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Arrows point at the edges that need to move, the message is centered.
pub fn render_too_small(frame: &mut Frame, area: Rect, theme: &Theme) {
    let narrow = area.width < MIN_TERMINAL_WIDTH;
    let short = area.height < MIN_TERMINAL_HEIGHT;
    let message = match (narrow, short) {
        (true, true) => "Make terminal larger",
        (true, false) => "Make terminal wider",
        _ => "Make terminal taller",
    };

    let arrow = Style::default().fg(theme.danger).add_modifier(Modifier::BOLD);
    let buf = frame.buffer_mut();
    let (w, h) = (area.width as usize, area.height as usize);
    if short {
        for x in 0..w {
            put(buf, area, x, 0, "↑", arrow);
            put(buf, area, x, h.saturating_sub(1), "↓", arrow);
        }
    }
    if narrow {
        for y in 0..h {
            put(buf, area, 0, y, "←", arrow);
            put(buf, area, w.saturating_sub(1), y, "→", arrow);
        }
    }

    let text = truncate_str(message, w.saturating_sub(2));
    let x = w.saturating_sub(text.chars().count()) / 2;
    put(buf, area, x, h / 2, &text, theme.text_style());
}
