use clap::ValueEnum;
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use super::widgets::{mix, ColorRamp};

/// Theme selection from the command line or config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    /// Pick dark or light from the terminal background.
    #[default]
    Auto,
    Dark,
    Light,
}

/// Data-driven theme: every color in one struct.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // ── Text ─────────────────────────────────────────────────
    pub text: Color,
    pub dim: Color,
    pub title: Color,
    pub accent: Color,
    pub warning: Color,
    pub danger: Color,

    // ── Borders ──────────────────────────────────────────────
    pub border: Color,

    /// Approximate terminal background, used for fading.
    pub background: Color,

    // ── Load bars ────────────────────────────────────────────
    pub load_ramp: ColorRamp,
    pub ram_ramp: ColorRamp,
    pub io_ramp: ColorRamp,
    pub cpu_row_ramp: ColorRamp,
    pub ram_row_ramp: ColorRamp,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            text: Color::Rgb(220, 220, 235),
            dim: Color::Rgb(120, 120, 145),
            title: Color::Rgb(129, 230, 217),
            accent: Color::Rgb(99, 179, 237),
            warning: Color::Rgb(255, 193, 69),
            danger: Color::Rgb(255, 85, 85),
            border: Color::Rgb(85, 85, 110),
            background: Color::Rgb(0, 0, 0),
            load_ramp: ColorRamp::new(vec![
                Color::Rgb(30, 100, 40),
                Color::Rgb(140, 120, 0),
                Color::Rgb(170, 30, 30),
            ]),
            ram_ramp: ColorRamp::new(vec![Color::Rgb(30, 60, 130), Color::Rgb(110, 40, 150)]),
            io_ramp: ColorRamp::new(vec![Color::Rgb(20, 90, 100), Color::Rgb(40, 140, 160)]),
            cpu_row_ramp: ColorRamp::new(vec![Color::Rgb(25, 55, 25), Color::Rgb(45, 125, 45)]),
            ram_row_ramp: ColorRamp::new(vec![Color::Rgb(25, 35, 80), Color::Rgb(50, 75, 165)]),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            text: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 145),
            title: Color::Rgb(0, 110, 120),
            accent: Color::Rgb(20, 90, 170),
            warning: Color::Rgb(170, 110, 0),
            danger: Color::Rgb(200, 30, 30),
            border: Color::Rgb(160, 160, 180),
            background: Color::Rgb(255, 255, 255),
            load_ramp: ColorRamp::new(vec![
                Color::Rgb(180, 230, 180),
                Color::Rgb(240, 225, 140),
                Color::Rgb(245, 160, 160),
            ]),
            ram_ramp: ColorRamp::new(vec![Color::Rgb(190, 210, 245), Color::Rgb(215, 185, 240)]),
            io_ramp: ColorRamp::new(vec![Color::Rgb(180, 230, 235), Color::Rgb(130, 210, 220)]),
            cpu_row_ramp: ColorRamp::new(vec![Color::Rgb(220, 245, 220), Color::Rgb(170, 225, 170)]),
            ram_row_ramp: ColorRamp::new(vec![Color::Rgb(220, 228, 250), Color::Rgb(175, 195, 240)]),
        }
    }

    /// Resolve a choice. `Auto` looks at `COLORFGBG`.
    pub fn resolve(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::Light => Self::light(),
            ThemeChoice::Auto => {
                let background = std::env::var("COLORFGBG")
                    .ok()
                    .and_then(|value| background_from_colorfgbg(&value));
                match background {
                    Some(rgb) if is_light(rgb) => Self::light(),
                    _ => Self::dark(),
                }
            }
        }
    }

    // ── Computed Styles ──────────────────────────────────────

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    pub fn table_header_style(&self) -> Style {
        Style::default().fg(self.text).add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn picked_style(&self) -> Style {
        Style::default().add_modifier(Modifier::REVERSED)
    }

    /// Foreign users stand out, root fades away unless we are root.
    pub fn username_style(&self, username: &str, current_user: &str) -> Style {
        if username == "root" && current_user != "root" {
            self.dim_style()
        } else if username != current_user {
            self.text_style().add_modifier(Modifier::BOLD)
        } else {
            self.text_style()
        }
    }

    /// Background for the part of a bar below its high-water mark.
    pub fn watermark_color(&self, ramp: &ColorRamp) -> Color {
        mix(ramp.faded(), self.background, 0.5)
    }

    /// Color for row `row` of `rows` when fading from text to dim.
    pub fn fade(&self, row: usize, rows: usize) -> Color {
        if rows <= 1 {
            return self.text;
        }
        mix(self.text, self.dim, row as f64 / (rows - 1) as f64)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// xterm's 16 ANSI colors.
const ANSI_RGB: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

/// `COLORFGBG` is `fg;bg` or `fg;default;bg`. The last field is the ANSI
/// index of the background.
pub fn background_from_colorfgbg(value: &str) -> Option<(u8, u8, u8)> {
    let index: usize = value.rsplit(';').next()?.trim().parse().ok()?;
    ANSI_RGB.get(index).copied()
}

/// Closer to white than to black.
pub fn is_light((r, g, b): (u8, u8, u8)) -> bool {
    let distance = |(tr, tg, tb): (f64, f64, f64)| {
        let (r, g, b) = (r as f64, g as f64, b as f64);
        (r - tr).powi(2) + (g - tg).powi(2) + (b - tb).powi(2)
    };
    distance((255.0, 255.0, 255.0)) < distance((0.0, 0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── COLORFGBG ─────────────────────────────────────────────────

    #[test]
    fn colorfgbg_last_field_is_background() {
        assert_eq!(background_from_colorfgbg("15;0"), Some((0, 0, 0)));
        assert_eq!(background_from_colorfgbg("0;default;15"), Some((255, 255, 255)));
        assert_eq!(background_from_colorfgbg("7;default"), None);
        assert_eq!(background_from_colorfgbg("0;99"), None);
    }

    #[test]
    fn light_detection() {
        assert!(is_light((255, 255, 255)));
        assert!(is_light((229, 229, 229)));
        assert!(!is_light((0, 0, 0)));
        assert!(!is_light((0, 0, 238)));
    }

    #[test]
    fn explicit_choices_ignore_environment() {
        assert_eq!(Theme::resolve(ThemeChoice::Dark).name, "dark");
        assert_eq!(Theme::resolve(ThemeChoice::Light).name, "light");
    }

    // ── styles ────────────────────────────────────────────────────

    #[test]
    fn username_styles() {
        let theme = Theme::dark();
        assert_eq!(theme.username_style("root", "alice"), theme.dim_style());
        assert_eq!(
            theme.username_style("bob", "alice"),
            theme.text_style().add_modifier(Modifier::BOLD)
        );
        assert_eq!(theme.username_style("alice", "alice"), theme.text_style());
        assert_eq!(theme.username_style("root", "root"), theme.text_style());
    }

    #[test]
    fn fade_runs_from_text_to_dim() {
        let theme = Theme::dark();
        assert_eq!(theme.fade(0, 5), theme.text);
        assert_eq!(theme.fade(4, 5), theme.dim);
        assert_eq!(theme.fade(0, 1), theme.text);
    }
}
