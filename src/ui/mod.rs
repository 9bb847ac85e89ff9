pub mod columns;
pub mod handlers;
mod renderer;
pub mod state;
pub mod theme;
pub mod widgets;

pub use handlers::{Action, EventHandler, Key, KillTarget};
pub use renderer::{render, RenderData};
pub use state::UiState;
pub use theme::{Theme, ThemeChoice};
