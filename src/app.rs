//! Application struct and event loop.
//!
//! Owns the terminal, the UI state and the samplers. Every input, from the
//! keyboard or the samplers, arrives as an [`Event`] on one channel and is
//! handled in arrival order.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event as term,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::crash::spawn_worker;
use crate::models::ProcessId;
use crate::monitor::{self, IoTracker, ProcessTracker};
use crate::ui::{self, Action, EventHandler, Key, KillTarget, RenderData, Theme, UiState};
use crate::utils::current_username;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    /// The process tracker published a new snapshot.
    ProcessListUpdated,
    Resized,
    /// Install `new`, but only if `old` is still the current handler.
    ReplaceEventHandler {
        old: EventHandler,
        new: EventHandler,
    },
    /// A background worker panicked; its name.
    WorkerCrashed(String),
}

/// Render timings collected for `--profile`.
#[derive(Debug, Default)]
pub struct Profile {
    frames: u64,
    total_render: Duration,
    max_render: Duration,
}

impl Profile {
    fn record(&mut self, elapsed: Duration) {
        self.frames += 1;
        self.total_render += elapsed;
        self.max_render = self.max_render.max(elapsed);
    }

    pub fn report(&self, ticks: u64) -> String {
        let mean = if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total_render.div_f64(self.frames as f64)
        };
        format!(
            "frames: {}\nmean render: {:.3}ms\nmax render: {:.3}ms\nprocess samples: {}\n",
            self.frames,
            mean.as_secs_f64() * 1000.0,
            self.max_render.as_secs_f64() * 1000.0,
            ticks
        )
    }
}

/// The terminal in raw mode on the alternate screen. Restored on drop, so
/// panics in the UI loop leave a usable terminal behind.
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Screen {
    fn open() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(Self { terminal })
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Main application struct.
pub struct App {
    state: UiState,
    theme: Theme,
    current_user: String,
    tracker: ProcessTracker,
    io: IoTracker,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    profile: Option<Profile>,
    induce_panic: bool,
}

impl App {
    pub fn new(config: &Config, profile: bool, induce_panic: bool) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: UiState::new(),
            theme: Theme::resolve(config.theme),
            current_user: current_username(),
            tracker: ProcessTracker::new(),
            io: IoTracker::new(),
            events_tx,
            events_rx,
            profile: profile.then(Profile::default),
            induce_panic,
        }
    }

    /// Run until the user quits or a worker crashes.
    pub async fn run(&mut self) -> Result<()> {
        let mut screen = Screen::open()?;
        self.start_workers()?;
        self.run_loop(&mut screen.terminal).await
    }

    /// `--profile` output, if profiling.
    pub fn profile_report(&self) -> Option<String> {
        self.profile
            .as_ref()
            .map(|p| p.report(self.tracker.ticks()))
    }

    fn start_workers(&self) -> Result<()> {
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);

        let tracker = self.tracker.clone();
        spawn_worker("process tracker", self.events_tx.clone(), move || {
            tracker.run(monitor::process_source(), wake_tx)
        })?;

        let io_tracker = self.io.clone();
        spawn_worker("io tracker", self.events_tx.clone(), move || {
            io_tracker.run(monitor::io_source())
        })?;

        let keyboard_tx = self.events_tx.clone();
        spawn_worker("keyboard", self.events_tx.clone(), move || {
            read_terminal_events(keyboard_tx)
        })?;

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            while wake_rx.recv().await.is_some() {
                if events.send(Event::ProcessListUpdated).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.draw(terminal)?;
        if self.induce_panic {
            panic!("Panicking on request (--panic)");
        }

        while !self.state.done {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.dispatch(event);
            if self.state.done {
                break;
            }
            // coalesce: only the last of a burst gets drawn
            if !self.events_rx.is_empty() {
                continue;
            }
            self.draw(terminal)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                if let Action::Kill(target) = self.state.handle_key(key) {
                    self.kill(target);
                }
            }
            Event::ProcessListUpdated | Event::Resized => {}
            Event::ReplaceEventHandler { old, new } => {
                if !self.state.replace_handler(&old, new) {
                    log::debug!("Ignoring stale handler replacement of {:?}", old);
                }
            }
            Event::WorkerCrashed(name) => {
                log::info!("Exiting since the {} worker is gone", name);
                self.state.done = true;
            }
        }
    }

    /// SIGKILL `target` in the background, then leave the kill prompt.
    fn kill(&self, target: KillTarget) {
        let id = ProcessId {
            pid: target.pid,
            start_time: target.start_time,
        };
        let still_running = self.tracker.snapshot().find(id).is_some();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            if still_running {
                send_sigkill(&target);
            } else {
                log::info!(
                    "Not killing {} ({}), it is no longer running",
                    target.pid,
                    target.command
                );
            }
            let _ = events
                .send(Event::ReplaceEventHandler {
                    old: EventHandler::Kill(target),
                    new: EventHandler::Base,
                })
                .await;
        });
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let started = Instant::now();

        let snapshot = self.tracker.snapshot().filtered(&self.state.filter);
        let overview = self.tracker.overview();
        let io_stats = self.io.stats();
        let io_total = self.io.total();
        let launches = self.tracker.launches();
        let data = RenderData {
            processes: &snapshot,
            overview: &overview,
            io_stats: &io_stats,
            io_total: &io_total,
            launches: launches.as_ref(),
            theme: &self.theme,
            current_user: &self.current_user,
        };
        let state = &mut self.state;
        terminal.draw(|frame| ui::render(frame, state, &data))?;

        if let Some(profile) = &mut self.profile {
            profile.record(started.elapsed());
        }
        Ok(())
    }
}

fn send_sigkill(target: &KillTarget) {
    // SAFETY: kill(2) only takes plain integers.
    let rc = unsafe { libc::kill(target.pid as libc::pid_t, libc::SIGKILL) };
    if rc == 0 {
        log::info!("Killed {} ({})", target.pid, target.command);
    } else {
        log::info!(
            "Killing {} ({}) failed: {}",
            target.pid,
            target.command,
            io::Error::last_os_error()
        );
    }
}

/// Forward key presses and resizes until the UI loop goes away.
fn read_terminal_events(events: mpsc::Sender<Event>) {
    loop {
        let event = match term::read() {
            Ok(event) => event,
            Err(e) => {
                log::error!("Reading terminal events failed: {}", e);
                let _ = events.blocking_send(Event::WorkerCrashed("keyboard".to_string()));
                return;
            }
        };
        let forwarded = match event {
            term::Event::Key(key) => Key::from_crossterm(key).map(Event::Key),
            term::Event::Resize(..) => Some(Event::Resized),
            _ => None,
        };
        if let Some(forwarded) = forwarded {
            if events.blocking_send(forwarded).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ThemeChoice;
    use ratatui::backend::TestBackend;
    use std::time::UNIX_EPOCH;

    fn test_app() -> App {
        let config = Config {
            theme: ThemeChoice::Dark,
            debug: false,
        };
        App::new(&config, true, false)
    }

    fn terminal() -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(100, 30)).unwrap()
    }

    fn frames(app: &App) -> u64 {
        app.profile.as_ref().map_or(0, |p| p.frames)
    }

    fn target() -> KillTarget {
        KillTarget {
            pid: 4_000_000,
            start_time: UNIX_EPOCH,
            command: "ghost".into(),
        }
    }

    // ── dispatch ──────────────────────────────────────────────────

    #[test]
    fn q_quits() {
        let mut app = test_app();
        app.dispatch(Event::Key(Key::Rune('q')));
        assert!(app.state.done);
    }

    #[test]
    fn stale_handler_replacement_is_ignored() {
        let mut app = test_app();
        app.state.handler = EventHandler::Filter;
        app.dispatch(Event::ReplaceEventHandler {
            old: EventHandler::Kill(target()),
            new: EventHandler::Base,
        });
        assert_eq!(app.state.handler, EventHandler::Filter);

        app.dispatch(Event::ReplaceEventHandler {
            old: EventHandler::Filter,
            new: EventHandler::Base,
        });
        assert_eq!(app.state.handler, EventHandler::Base);
    }

    #[test]
    fn worker_crash_ends_the_loop() {
        let mut app = test_app();
        app.dispatch(Event::WorkerCrashed("io tracker".into()));
        assert!(app.state.done);
    }

    #[tokio::test]
    async fn confirmed_kill_returns_to_base() {
        let mut app = test_app();
        app.state.handler = EventHandler::Kill(target());
        app.dispatch(Event::Key(Key::Rune('k')));
        // still prompting until the kill task reports back
        assert_eq!(app.state.handler, EventHandler::Kill(target()));

        let event = app.events_rx.recv().await.unwrap();
        assert_eq!(
            event,
            Event::ReplaceEventHandler {
                old: EventHandler::Kill(target()),
                new: EventHandler::Base,
            }
        );
        app.dispatch(event);
        assert_eq!(app.state.handler, EventHandler::Base);
    }

    // ── loop ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn queued_events_are_coalesced() {
        let mut app = test_app();
        for _ in 0..3 {
            app.events_tx.send(Event::ProcessListUpdated).await.unwrap();
        }
        app.events_tx.send(Event::Key(Key::Rune('q'))).await.unwrap();

        app.run_loop(&mut terminal()).await.unwrap();
        // only the initial frame, the burst ended in quitting
        assert_eq!(frames(&app), 1);
    }

    #[tokio::test]
    async fn each_burst_draws_once() {
        let mut app = test_app();
        for _ in 0..3 {
            app.events_tx.send(Event::ProcessListUpdated).await.unwrap();
        }
        let tx = app.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(Event::Resized).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(Event::Key(Key::Interrupt)).await.unwrap();
        });

        app.run_loop(&mut terminal()).await.unwrap();
        assert_eq!(frames(&app), 3);
    }

    #[test]
    fn profile_report_lists_frames() {
        let mut profile = Profile::default();
        profile.record(Duration::from_millis(2));
        profile.record(Duration::from_millis(4));
        let report = profile.report(7);
        assert!(report.contains("frames: 2"));
        assert!(report.contains("mean render: 3.000ms"));
        assert!(report.contains("max render: 4.000ms"));
        assert!(report.contains("process samples: 7"));
    }

    #[test]
    fn mean_render_survives_huge_frame_counts() {
        let frames = u64::from(u32::MAX) + 1;
        let profile = Profile {
            frames,
            total_render: Duration::from_millis(frames),
            max_render: Duration::from_millis(5),
        };
        assert!(profile.report(0).contains("mean render: 1.000ms"));
    }
}
