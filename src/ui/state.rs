use crate::models::Process;

use super::handlers::{Action, EventHandler, Key, KillTarget};

/// Everything the UI remembers between frames. Owned by the event loop.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub filter: String,
    /// Cursor row in the process table.
    pub picked_line: Option<usize>,
    /// The process under the cursor, kept in sync with `picked_line` by
    /// [`UiState::resolve_pick`].
    pub picked_process: Option<Process>,
    pub handler: EventHandler,
    pub done: bool,
    /// Three panes are not attempted below this width.
    pub min_three_panes_width: u16,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_pick(&mut self) {
        self.picked_line = None;
        self.picked_process = None;
    }

    /// Feed one key press to the current handler.
    pub fn handle_key(&mut self, key: Key) -> Action {
        if key == Key::Interrupt {
            self.done = true;
            return Action::None;
        }
        match self.handler.clone() {
            EventHandler::Base => self.handle_base(key),
            EventHandler::Filter => {
                self.handle_filter(key);
                Action::None
            }
            EventHandler::Kill(target) => self.handle_kill(key, target),
        }
    }

    fn handle_base(&mut self, key: Key) -> Action {
        match key {
            Key::Rune('q') => self.done = true,
            Key::Rune('/') | Key::Rune('f') => self.handler = EventHandler::Filter,
            Key::Rune('k') => {
                if let Some(process) = &self.picked_process {
                    self.handler = EventHandler::Kill(KillTarget::of(process));
                }
            }
            Key::Escape => {
                if self.picked_line.is_some() {
                    self.clear_pick();
                } else {
                    self.done = true;
                }
            }
            Key::Backspace => self.filter.clear(),
            Key::Down => {
                self.picked_line = Some(self.picked_line.map_or(0, |line| line + 1));
                self.picked_process = None;
            }
            Key::Up => match self.picked_line {
                Some(0) => self.clear_pick(),
                Some(line) => {
                    self.picked_line = Some(line - 1);
                    self.picked_process = None;
                }
                None => {}
            },
            _ => {}
        }
        Action::None
    }

    fn handle_filter(&mut self, key: Key) {
        match key {
            Key::Rune(c) => self.filter.push(c),
            Key::Escape | Key::Enter => self.handler = EventHandler::Base,
            Key::Backspace => {
                self.filter.pop();
            }
            _ => {}
        }
    }

    fn handle_kill(&mut self, key: Key, target: KillTarget) -> Action {
        match key {
            // The event loop switches back to Base once the signal is sent.
            Key::Rune('k') => Action::Kill(target),
            Key::Rune(_) | Key::Escape => {
                self.handler = EventHandler::Base;
                Action::None
            }
            _ => Action::None,
        }
    }

    /// Install `new` only if the current handler is still `old`. Returns
    /// false for stale replacements.
    pub fn replace_handler(&mut self, old: &EventHandler, new: EventHandler) -> bool {
        if self.handler != *old {
            return false;
        }
        self.handler = new;
        true
    }

    /// Make `picked_line` and `picked_process` agree with `display`, the
    /// process list in display order. The picked process is moved to the
    /// picked line so the cursor follows it through resorts.
    /// `max_visible_index` is the last table row that is on screen.
    pub fn resolve_pick(&mut self, display: &mut Vec<Process>, max_visible_index: usize) {
        let Some(line) = self.picked_line else {
            self.picked_process = None;
            return;
        };
        if display.is_empty() {
            self.clear_pick();
            return;
        }

        let line = line.min(display.len() - 1).min(max_visible_index);
        self.picked_line = Some(line);

        if let Some(picked) = &self.picked_process {
            match display.iter().position(|p| p.same_as(picked)) {
                Some(current) => move_to_position(display, current, line),
                None => {
                    self.clear_pick();
                    return;
                }
            }
        }
        self.picked_process = Some(display[line].clone());
    }
}

/// Move the element at `from` to `to`, keeping everybody else in order.
pub fn move_to_position<T>(list: &mut Vec<T>, from: usize, to: usize) {
    if from >= list.len() {
        return;
    }
    let value = list.remove(from);
    let to = to.min(list.len());
    list.insert(to, value);
}
