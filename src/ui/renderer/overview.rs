//! Overview row: system load, memory and I/O summaries plus the per-device
//! I/O column.

use ratatui::{layout::Rect, widgets::Widget, Frame};
use unicode_width::UnicodeWidthStr;

use crate::models::{IoStat, SystemOverview};
use crate::ui::theme::Theme;
use crate::ui::widgets::LoadBar;
use crate::utils::{format_memory, format_rate};

use super::helpers::{pane, put};
use super::RenderData;

pub fn sysload_text(overview: &SystemOverview) -> String {
    format!(
        "Sysload: {:.2} [{} cores | {} physical]",
        overview.load_avg_1, overview.logical_cpus, overview.physical_cpus
    )
}

pub fn memory_text(overview: &SystemOverview) -> String {
    format!(
        "RAM Use: {} / {}",
        format_memory(overview.used_memory_kb),
        format_memory(overview.total_memory_kb)
    )
}

pub fn io_text(total: &IoStat) -> String {
    format!(
        "IO Load: {}/s [max {}/s]",
        format_rate(total.bytes_per_second),
        format_rate(total.high_watermark)
    )
}

pub fn render_overview(frame: &mut Frame, area: Rect, data: &RenderData) {
    let theme = data.theme;
    let block = pane("Overview", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let overview = data.overview;
    let total = data.io_total;
    let io_bar = LoadBar::new(total.fraction(), &theme.io_ramp).background(theme.background);
    let io_bar = if total.high_watermark > 0.0 {
        io_bar.watermark(1.0, theme.watermark_color(&theme.io_ramp))
    } else {
        io_bar
    };

    let rows = [
        (
            sysload_text(overview),
            LoadBar::new(overview.load_fraction(), &theme.load_ramp).background(theme.background),
        ),
        (
            memory_text(overview),
            LoadBar::new(overview.memory_fraction(), &theme.ram_ramp).background(theme.background),
        ),
        (io_text(total), io_bar),
    ];

    let buf = frame.buffer_mut();
    for (y, (text, bar)) in rows.into_iter().enumerate() {
        if y >= inner.height as usize {
            break;
        }
        put(buf, inner, 1, y, &text, theme.text_style());
        bar.render(row(inner, y), buf);
    }
}

/// Busiest devices first, as many as there are rows.
pub fn render_io_column(frame: &mut Frame, area: Rect, data: &RenderData) {
    let theme = data.theme;
    let block = pane("IO", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let buf = frame.buffer_mut();
    for (y, stat) in data.io_stats.iter().take(inner.height as usize).enumerate() {
        render_io_row(buf, row(inner, y), stat, theme);
    }
}

fn render_io_row(buf: &mut ratatui::buffer::Buffer, area: Rect, stat: &IoStat, theme: &Theme) {
    let rate = format!("{}/s", format_rate(stat.bytes_per_second));
    let width = area.width as usize;
    put(buf, area, 0, 0, &stat.device_name, theme.text_style());
    put(
        buf,
        area,
        width.saturating_sub(rate.width()),
        0,
        &rate,
        theme.text_style(),
    );
    LoadBar::new(stat.fraction(), &theme.io_ramp)
        .background(theme.background)
        .render(area, buf);
}

fn row(inner: Rect, y: usize) -> Rect {
    Rect::new(inner.x, inner.y + y as u16, inner.width, 1)
}
