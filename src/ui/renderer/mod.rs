//! Frame renderer: splits the terminal and delegates to the pane renderers.

mod helpers;
mod launches;
mod overlays;
mod overview;
mod processes;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::constants::{
    IO_COLUMN_WIDTH, MIN_PROCESSES_HEIGHT, MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH,
    OVERVIEW_HEIGHT, OVERVIEW_MIN_WIDTH,
};
use crate::models::{IoStat, Snapshot, SystemOverview};
use crate::monitor::LaunchNode;

use super::handlers::EventHandler;
use super::state::UiState;
use super::theme::Theme;


/// Everything one frame shows besides the UI state.
pub struct RenderData<'a> {
    /// Already filtered.
    pub processes: &'a Snapshot,
    pub overview: &'a SystemOverview,
    pub io_stats: &'a [IoStat],
    pub io_total: &'a IoStat,
    pub launches: Option<&'a LaunchNode>,
    pub theme: &'a Theme,
    pub current_user: &'a str,
}

/// Draw one frame. Resolves the pick and may raise the three-pane width
/// threshold, hence `&mut`.
pub fn render(frame: &mut Frame, state: &mut UiState, data: &RenderData) {
    let area = frame.area();
    if area.width < MIN_TERMINAL_WIDTH || area.height < MIN_TERMINAL_HEIGHT {
        overlays::render_too_small(frame, area, data.theme);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(OVERVIEW_HEIGHT), Constraint::Min(0)])
        .split(area);

    render_top_row(frame, chunks[0], data);

    let tree_height = data.launches.map_or(0, LaunchNode::height);
    let launch_height = launch_pane_height(area.height, chunks[1].height, tree_height);
    let rest = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(launch_height)])
        .split(chunks[1]);

    processes::render_process_panes(frame, rest[0], state, data);
    if launch_height > 0 {
        if let Some(tree) = data.launches {
            launches::render_launches(frame, rest[1], tree, data.theme);
        }
    }

    if let EventHandler::Kill(target) = &state.handler {
        overlays::render_kill_modal(frame, area, target, data.theme);
    }
}

fn render_top_row(frame: &mut Frame, area: Rect, data: &RenderData) {
    if area.width < OVERVIEW_MIN_WIDTH + IO_COLUMN_WIDTH {
        overview::render_overview(frame, area, data);
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(IO_COLUMN_WIDTH)])
        .split(area);
    overview::render_overview(frame, chunks[0], data);
    overview::render_io_column(frame, chunks[1], data);
}

/// Rows given to the launch tree out of `available` rows below the
/// overview, for a terminal `terminal_height` rows tall.
pub fn launch_pane_height(terminal_height: u16, available: u16, tree_height: usize) -> u16 {
    let wanted = (tree_height as u64 + 2).min(u64::from(
        terminal_height.saturating_sub(OVERVIEW_HEIGHT) / 3,
    )) as u16;
    if wanted <= 2 || available.saturating_sub(wanted) < MIN_PROCESSES_HEIGHT {
        return 0;
    }
    wanted
}
