//! Keyboard semantics of the three input modes.

use std::time::SystemTime;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::models::Process;

/// The process a kill prompt is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillTarget {
    pub pid: u32,
    pub start_time: SystemTime,
    pub command: String,
}

impl KillTarget {
    pub fn of(process: &Process) -> Self {
        Self {
            pid: process.pid,
            start_time: process.start_time,
            command: process.command.clone(),
        }
    }
}

/// Which handler currently receives key presses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventHandler {
    #[default]
    Base,
    Filter,
    Kill(KillTarget),
}

/// Key presses the handlers care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Rune(char),
    Escape,
    Enter,
    Backspace,
    Up,
    Down,
    /// Ctrl-C, quits from any handler.
    Interrupt,
}

impl Key {
    /// `None` for releases and keys nobody handles.
    pub fn from_crossterm(event: KeyEvent) -> Option<Key> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        match event.code {
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Key::Interrupt)
            }
            KeyCode::Char(c) => Some(Key::Rune(c)),
            KeyCode::Esc => Some(Key::Escape),
            KeyCode::Enter => Some(Key::Enter),
            KeyCode::Backspace => Some(Key::Backspace),
            KeyCode::Up => Some(Key::Up),
            KeyCode::Down => Some(Key::Down),
            _ => None,
        }
    }
}

/// Side effects a key press asks the event loop to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Kill(KillTarget),
}
