//! Shared rendering helpers: bordered panes, centered rects, clipped text.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders},
};

use crate::ui::theme::Theme;

/// A bordered pane with a title in the top border.
pub fn pane<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(Span::styled(format!(" {} ", title), theme.title_style()))
        .borders(Borders::ALL)
        .border_style(theme.border_style())
}

/// Same as [`pane`] with a prompt in the bottom border.
pub fn pane_with_prompt<'a>(title: &str, prompt: Line<'a>, theme: &Theme) -> Block<'a> {
    pane(title, theme).title_bottom(prompt)
}

/// Return a `Rect` centered within `area` with the given dimensions.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Write `text` at (`x`, `y`) relative to `area`, clipped to it.
pub fn put(buf: &mut Buffer, area: Rect, x: usize, y: usize, text: &str, style: Style) {
    if x >= area.width as usize || y >= area.height as usize {
        return;
    }
    buf.set_stringn(
        area.x + x as u16,
        area.y + y as u16,
        text,
        area.width as usize - x,
        style,
    );
}

/// The whole buffer row by row, trailing blanks removed.
#[cfg(test)]
pub fn buffer_lines(buf: &Buffer) -> Vec<String> {
    let area = buf.area;
    (area.y..area.y + area.height)
        .map(|y| {
            (area.x..area.x + area.width)
                .map(|x| buf[(x, y)].symbol())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── centered_rect ─────────────────────────────────────────────

    #[test]
    fn centered_rect_basic() {
        let area = Rect::new(0, 0, 100, 50);
        let r = centered_rect(40, 20, area);
        assert_eq!(r, Rect::new(30, 15, 40, 20));
    }

    #[test]
    fn centered_rect_larger_than_area() {
        let area = Rect::new(0, 0, 20, 10);
        let r = centered_rect(40, 20, area);
        assert_eq!(r, Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn centered_rect_with_offset() {
        let area = Rect::new(10, 5, 100, 50);
        let r = centered_rect(40, 20, area);
        assert_eq!(r.x, 40);
        assert_eq!(r.y, 20);
    }

    // ── put ───────────────────────────────────────────────────────

    #[test]
    fn put_clips_to_area() {
        let area = Rect::new(0, 0, 5, 2);
        let mut buf = Buffer::empty(area);
        put(&mut buf, area, 2, 0, "abcdef", Style::default());
        put(&mut buf, area, 0, 2, "gone", Style::default());
        put(&mut buf, area, 9, 1, "gone", Style::default());
        assert_eq!(buffer_lines(&buf), vec!["  abc", ""]);
    }
}
