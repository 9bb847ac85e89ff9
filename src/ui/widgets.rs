use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

/// Linear blend of two colors, `fraction` 0 gives `a`, 1 gives `b`. Named
/// (non-RGB) colors can't be blended and snap to the nearer end.
pub fn mix(a: Color, b: Color, fraction: f64) -> Color {
    let f = fraction.clamp(0.0, 1.0);
    match (a, b) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
            Color::Rgb(lerp(r1, r2), lerp(g1, g2), lerp(b1, b2))
        }
        _ if f < 0.5 => a,
        _ => b,
    }
}

/// Anchor colors evenly spread over 0..=1, interpolated in between.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    anchors: Vec<Color>,
}

impl ColorRamp {
    pub fn new(anchors: Vec<Color>) -> Self {
        if anchors.is_empty() {
            return Self {
                anchors: vec![Color::Reset],
            };
        }
        Self { anchors }
    }

    pub fn at(&self, fraction: f64) -> Color {
        let f = fraction.clamp(0.0, 1.0);
        if self.anchors.len() == 1 {
            return self.anchors[0];
        }
        let segments = self.anchors.len() - 1;
        let position = f * segments as f64;
        let i = (position.floor() as usize).min(segments - 1);
        mix(self.anchors[i], self.anchors[i + 1], position - i as f64)
    }

    /// Halfway between the first two anchors.
    pub fn faded(&self) -> Color {
        let second = self.anchors.get(1).copied().unwrap_or(self.anchors[0]);
        mix(self.anchors[0], second, 0.5)
    }
}

/// Center of cell `i` as a fraction of `width`.
fn cell_center(i: u16, width: u16) -> f64 {
    (i as f64 + 0.5) / width as f64
}

/// How much of cell `i` a bar of `fraction` covers, 0..=1.
fn coverage(fraction: f64, i: u16, width: u16) -> f64 {
    (fraction * width as f64 - i as f64).clamp(0.0, 1.0)
}

/// Ramp color for cell `i`, blended into `base` when the cell is only
/// partly covered. `None` when the bar doesn't reach the cell.
fn bar_color(ramp: &ColorRamp, fraction: f64, i: u16, width: u16, base: Color) -> Option<Color> {
    let covered = coverage(fraction, i, width);
    if covered <= 0.0 {
        return None;
    }
    let color = ramp.at(cell_center(i, width));
    if covered >= 1.0 {
        Some(color)
    } else {
        Some(mix(base, color, covered))
    }
}

/// Colors the background of the first row of its area. Text already in
/// the buffer stays.
pub struct LoadBar<'a> {
    pub fraction: f64,
    pub ramp: &'a ColorRamp,
    /// Extent and color of the high-water mark, if any.
    pub watermark: Option<(f64, Color)>,
    /// What a partly covered edge cell fades into.
    pub background: Color,
}

impl<'a> LoadBar<'a> {
    pub fn new(fraction: f64, ramp: &'a ColorRamp) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            ramp,
            watermark: None,
            background: Color::Reset,
        }
    }

    pub fn watermark(mut self, fraction: f64, color: Color) -> Self {
        self.watermark = Some((fraction.clamp(0.0, 1.0), color));
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }
}

impl Widget for LoadBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        for i in 0..area.width {
            let mark = self
                .watermark
                .filter(|(mark, _)| cell_center(i, area.width) < *mark)
                .map(|(_, color)| color);
            let base = mark.unwrap_or(self.background);
            let color = bar_color(self.ramp, self.fraction, i, area.width, base).or(mark);
            if let (Some(color), Some(cell)) = (color, buf.cell_mut((area.x + i, area.y))) {
                cell.set_bg(color);
            }
        }
    }
}

/// Two load bars sharing one row. Blank cells are split with half blocks so
/// both stay visible; cells with text get the background of the shorter
/// bar. At most one symbol is written per cell.
pub struct OverlappingLoadBars<'a> {
    pub top_fraction: f64,
    pub top_ramp: &'a ColorRamp,
    pub bottom_fraction: f64,
    pub bottom_ramp: &'a ColorRamp,
    /// What partly covered edge cells fade into.
    pub background: Color,
}

impl Widget for OverlappingLoadBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        for i in 0..area.width {
            let top = bar_color(self.top_ramp, self.top_fraction, i, area.width, self.background);
            let bottom = bar_color(
                self.bottom_ramp,
                self.bottom_fraction,
                i,
                area.width,
                self.background,
            );
            let Some(cell) = buf.cell_mut((area.x + i, area.y)) else {
                continue;
            };

            if cell.symbol() == " " {
                match (top, bottom) {
                    (Some(top), Some(bottom)) => {
                        cell.set_char('▀').set_fg(top).set_bg(bottom);
                    }
                    (Some(top), None) => {
                        cell.set_char('▀').set_fg(top);
                    }
                    (None, Some(bottom)) => {
                        cell.set_char('▄').set_fg(bottom);
                    }
                    (None, None) => {}
                }
                continue;
            }

            let color = match (top, bottom) {
                (Some(top), Some(bottom)) => {
                    if self.top_fraction <= self.bottom_fraction {
                        Some(top)
                    } else {
                        Some(bottom)
                    }
                }
                (one, other) => one.or(other),
            };
            if let Some(color) = color {
                cell.set_bg(color);
            }
        }
    }
}
