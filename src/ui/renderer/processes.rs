//! Process panes: the process table and, when there is room, the "By User"
//! and "By Command" aggregates to its right.

use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::models::Process;
use crate::ranking::{by_command, by_user, sorted_processes, Aggregate};
use crate::ui::columns::{fits, pad, solve_widths, Align, Grow};
use crate::ui::state::UiState;
use crate::ui::theme::Theme;
use crate::ui::widgets::OverlappingLoadBars;
use crate::utils::{format_duration, format_memory};

use super::helpers::{pane, pane_with_prompt, put};
use super::overlays::prompt;
use super::RenderData;

const COMMAND_COLUMN: usize = 1;
/// Time and RAM in the process table.
const PROCESS_FIT_COLUMNS: [usize; 2] = [3, 4];
/// Time and RAM in the aggregate tables.
const AGGREGATE_FIT_COLUMNS: [usize; 2] = [1, 2];

struct TableRow {
    cells: Vec<String>,
    styles: Vec<Style>,
    /// Display width of the dedup suffix at the end of the command cell.
    suffix_width: usize,
    cpu_time: Duration,
    rss_kb: u64,
}

struct TextTable {
    header: Vec<String>,
    aligns: Vec<Align>,
    grow: Grow,
    rows: Vec<TableRow>,
}

impl TextTable {
    fn text(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().map(|r| r.cells.clone()))
            .collect()
    }

    /// Widths for a pane `pane_width` columns wide, borders included.
    fn widths(&self, pane_width: u16) -> Vec<usize> {
        let separators = self.header.len().saturating_sub(1);
        let available = (pane_width as usize).saturating_sub(2 + separators);
        solve_widths(&self.text(), available, self.grow)
    }

    fn fits(&self, widths: &[usize], columns: &[usize]) -> bool {
        fits(&self.text(), widths, columns)
    }
}

fn process_table(processes: &[Process], data: &RenderData) -> TextTable {
    let theme = data.theme;
    let rows = processes
        .iter()
        .map(|p| TableRow {
            cells: vec![
                p.pid.to_string(),
                format!("{}{}", p.command, p.deduplication_suffix),
                p.username.clone(),
                p.cpu_time
                    .map(format_duration)
                    .unwrap_or_else(|| "-".to_string()),
                format_memory(p.rss_kb),
            ],
            styles: vec![
                theme.text_style(),
                theme.text_style(),
                theme.username_style(&p.username, data.current_user),
                theme.text_style(),
                theme.text_style(),
            ],
            suffix_width: p.deduplication_suffix.width(),
            cpu_time: p.cpu_time_or_zero(),
            rss_kb: p.rss_kb,
        })
        .collect();

    TextTable {
        header: ["PID", "Command", "User", "Time", "RAM"]
            .map(String::from)
            .to_vec(),
        aligns: vec![Align::Right, Align::Left, Align::Left, Align::Right, Align::Right],
        grow: Grow::SkipFirst,
        rows,
    }
}

fn aggregate_table(name: &str, aggregates: &[Aggregate], name_style: impl Fn(&str) -> Style) -> TextTable {
    let rows = aggregates
        .iter()
        .map(|a| TableRow {
            cells: vec![
                a.name.clone(),
                format_duration(a.cpu_time),
                format_memory(a.rss_kb),
            ],
            styles: vec![name_style(&a.name), Style::default(), Style::default()],
            suffix_width: 0,
            cpu_time: a.cpu_time,
            rss_kb: a.rss_kb,
        })
        .collect();

    TextTable {
        header: vec![name.to_string(), "Time".to_string(), "RAM".to_string()],
        aligns: vec![Align::Left, Align::Right, Align::Right],
        grow: Grow::All,
        rows,
    }
}

/// Draws the process panes into `area`. Resolves the pick first, and raises
/// `min_three_panes_width` when three panes don't fit.
pub fn render_process_panes(frame: &mut Frame, area: Rect, state: &mut UiState, data: &RenderData) {
    let theme = data.theme;

    let mut display = sorted_processes(data.processes);
    // borders and header take three rows
    let max_visible_index = (area.height as usize).saturating_sub(4);
    state.resolve_pick(&mut display, max_visible_index);

    let main = process_table(&display, data);
    let main_block = pane_with_prompt("Processes", prompt(state, theme), theme);

    if area.width >= state.min_three_panes_width {
        let right_width = area.width / 3;
        let left = Rect {
            width: area.width - right_width,
            ..area
        };
        let right = Rect {
            x: area.x + left.width,
            width: right_width,
            ..area
        };
        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(right);

        let current_user = data.current_user;
        let users = aggregate_table("User", &by_user(data.processes), |name| {
            theme.username_style(name, current_user)
        });
        let commands = aggregate_table("Command", &by_command(data.processes), |_| {
            theme.text_style()
        });

        let main_widths = main.widths(left.width);
        let user_widths = users.widths(right.width);
        let command_widths = commands.widths(right.width);
        if main.fits(&main_widths, &PROCESS_FIT_COLUMNS)
            && users.fits(&user_widths, &AGGREGATE_FIT_COLUMNS)
            && commands.fits(&command_widths, &AGGREGATE_FIT_COLUMNS)
        {
            draw_table(frame, left, main_block, &main, &main_widths, state.picked_line, theme);
            draw_table(frame, halves[0], pane("By User", theme), &users, &user_widths, None, theme);
            draw_table(
                frame,
                halves[1],
                pane("By Command", theme),
                &commands,
                &command_widths,
                None,
                theme,
            );
            return;
        }
        state.min_three_panes_width = area.width + 1;
    }

    let widths = main.widths(area.width);
    draw_table(frame, area, main_block, &main, &widths, state.picked_line, theme);
}

fn fraction(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    value / max
}

fn draw_table(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    table: &TextTable,
    widths: &[usize],
    picked: Option<usize>,
    theme: &Theme,
) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let buf = frame.buffer_mut();

    let mut x = 0;
    for (c, &width) in widths.iter().enumerate() {
        let text = pad(&table.header[c], width, table.aligns[c]);
        put(buf, inner, x, 0, &text, theme.table_header_style());
        x += width + 1;
    }

    let visible = (inner.height as usize).saturating_sub(1);
    let rows = &table.rows[..table.rows.len().min(visible)];
    // bars are relative to what is on screen
    let max_cpu = rows
        .iter()
        .map(|r| r.cpu_time.as_secs_f64())
        .fold(0.0, f64::max);
    let max_rss = rows.iter().map(|r| r.rss_kb).max().unwrap_or(0) as f64;

    for (i, row) in rows.iter().enumerate() {
        let y = i + 1;
        draw_row(buf, inner, y, row, table, widths, theme);

        let strip = Rect::new(inner.x, inner.y + y as u16, inner.width, 1);
        if picked == Some(i) {
            buf.set_style(strip, theme.picked_style());
            continue;
        }
        OverlappingLoadBars {
            top_fraction: fraction(row.cpu_time.as_secs_f64(), max_cpu),
            top_ramp: &theme.cpu_row_ramp,
            bottom_fraction: fraction(row.rss_kb as f64, max_rss),
            bottom_ramp: &theme.ram_row_ramp,
            background: theme.background,
        }
        .render(strip, buf);
    }
}

fn draw_row(
    buf: &mut Buffer,
    inner: Rect,
    y: usize,
    row: &TableRow,
    table: &TextTable,
    widths: &[usize],
    theme: &Theme,
) {
    let mut x = 0;
    for (c, &width) in widths.iter().enumerate() {
        let cell = &row.cells[c];
        put(buf, inner, x, y, &pad(cell, width, table.aligns[c]), row.styles[c]);

        if c == COMMAND_COLUMN && row.suffix_width > 0 {
            let command_width = cell.width() - row.suffix_width;
            let end = cell.width().min(width);
            if command_width < end {
                let suffix = Rect::new(
                    inner.x + (x + command_width) as u16,
                    inner.y + y as u16,
                    (end - command_width) as u16,
                    1,
                );
                buf.set_style(suffix, theme.dim_style());
            }
        }
        x += width + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IoStat, Snapshot, SystemOverview};
    use crate::ui::renderer::helpers::buffer_lines;
    use ratatui::{
        backend::TestBackend,
        style::{Color, Modifier},
        Terminal,
    };
    use std::time::UNIX_EPOCH;

    fn make_process(pid: u32, cmdline: &str, user: &str, cpu_secs: u64, rss_kb: u64) -> Process {
        Process::new(
            pid,
            Some(1),
            UNIX_EPOCH + Duration::from_secs(1000 + pid as u64),
            cmdline,
            user,
            rss_kb,
            Some(Duration::from_secs(cpu_secs)),
        )
    }

    fn draw(width: u16, height: u16, state: &mut UiState, snapshot: &Snapshot) -> Buffer {
        let overview = SystemOverview::default();
        let total = IoStat {
            device_name: "total".into(),
            bytes_per_second: 0.0,
            high_watermark: 0.0,
        };
        let theme = Theme::dark();
        let data = RenderData {
            processes: snapshot,
            overview: &overview,
            io_stats: &[],
            io_total: &total,
            launches: None,
            theme: &theme,
            current_user: "alice",
        };
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| render_process_panes(f, f.area(), state, &data))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn row_of(buf: &Buffer, needle: &str) -> u16 {
        buffer_lines(buf)
            .iter()
            .position(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("{} not drawn", needle)) as u16
    }

    /// Screen column of the first `needle` on row `y`.
    fn column_of(buf: &Buffer, y: u16, needle: &str) -> u16 {
        let line = &buffer_lines(buf)[y as usize];
        let byte = line.find(needle).unwrap_or(0);
        line[..byte].chars().count() as u16
    }

    // ── table contents ────────────────────────────────────────────

    #[test]
    fn rows_in_score_order() {
        let snapshot = Snapshot::new(vec![
            make_process(10, "idle", "alice", 0, 100),
            make_process(11, "busy", "alice", 50, 200),
        ]);
        let buf = draw(60, 10, &mut UiState::new(), &snapshot);
        let lines = buffer_lines(&buf);
        assert!(lines[1].contains("PID"));
        assert!(lines[1].contains("Command"));
        assert!(lines[2].contains("busy"));
        assert!(lines[2].contains("50s"));
        assert!(lines[3].contains("idle"));
    }

    #[test]
    fn dedup_suffix_is_dimmed() {
        let mut process = make_process(10, "bash", "alice", 1, 100);
        process.deduplication_suffix = "2".into();
        let snapshot = Snapshot::new(vec![process]);
        let buf = draw(60, 10, &mut UiState::new(), &snapshot);

        let y = row_of(&buf, "bash2");
        let x = column_of(&buf, y, "bash2") + 4;
        let theme = Theme::dark();
        assert_eq!(buf[(x, y)].fg, theme.dim);
        assert_eq!(buf[(x - 1, y)].fg, theme.text);
    }

    #[test]
    fn foreign_users_are_bold() {
        let snapshot = Snapshot::new(vec![make_process(10, "nginx", "www", 1, 100)]);
        let buf = draw(60, 10, &mut UiState::new(), &snapshot);
        let y = row_of(&buf, "www");
        let x = column_of(&buf, y, "www");
        assert!(buf[(x, y)].modifier.contains(Modifier::BOLD));
    }

    // ── pick and bars ─────────────────────────────────────────────

    #[test]
    fn picked_row_is_reversed_without_bars() {
        let snapshot = Snapshot::new(vec![
            make_process(10, "busy", "alice", 50, 200),
            make_process(11, "idle", "alice", 0, 100),
        ]);
        let mut state = UiState::new();
        state.picked_line = Some(0);
        let buf = draw(60, 10, &mut state, &snapshot);

        assert_eq!(state.picked_process.as_ref().map(|p| p.pid), Some(10));
        let y = row_of(&buf, "busy");
        assert!(buf[(1, y)].modifier.contains(Modifier::REVERSED));
        assert_eq!(buf[(1, y)].bg, Color::Reset);
        assert!(!buf[(1, y + 1)].modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn bars_are_relative_to_the_heaviest_row() {
        let snapshot = Snapshot::new(vec![
            make_process(10, "busy", "alice", 50, 200),
            make_process(11, "idle", "alice", 0, 100),
        ]);
        let buf = draw(60, 10, &mut UiState::new(), &snapshot);
        let theme = Theme::dark();

        // blank cells right after the command name
        let y = row_of(&buf, "busy");
        let cell = &buf[(column_of(&buf, y, "busy") + 6, y)];
        assert_eq!(cell.symbol(), "▀");
        assert_ne!(cell.bg, Color::Reset);

        // no CPU and half the RAM: lower half only, and only on the left
        let y = row_of(&buf, "idle");
        let cell = &buf[(column_of(&buf, y, "idle") + 6, y)];
        assert_eq!(cell.symbol(), "▄");
        assert_ne!(cell.fg, theme.text);
        assert_eq!(cell.bg, Color::Reset);
    }

    #[test]
    fn pick_is_clamped_to_the_screen() {
        let processes = (0..20)
            .map(|i| make_process(100 + i, "worker", "alice", i as u64, 10))
            .collect();
        let snapshot = Snapshot::new(processes);
        let mut state = UiState::new();
        state.picked_line = Some(15);
        // 10 rows: borders plus header leave 7 table rows
        draw(60, 10, &mut state, &snapshot);
        assert_eq!(state.picked_line, Some(6));
    }
}
