use crate::controller::Notice;
use crate::models::{Snapshot, Watchlist};
use crate::trend::{price_rows, trend_lines, PriceRow, TrendLine};
use crate::worker::{RefreshReport, WorkerCommand, WorkerEvent};
use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    AddSymbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Quit,
    Send(WorkerCommand),
}

/// Screen state. Owns copies of what the worker last reported; never touches the cache.
pub struct App {
    pub watchlist: Watchlist,
    pub table: Snapshot,
    pub rows: Vec<PriceRow>,
    pub lines: Vec<TrendLine>,
    pub banner: Option<String>,
    pub input_mode: InputMode,
    /// Commands sent to the worker that haven't been answered yet.
    pending: usize,
    pub last_update: Option<DateTime<Local>>,
    pub refresh_interval: Duration,
    last_tick: Instant,
}

impl App {
    pub fn new(watchlist: Watchlist, refresh_interval: Duration) -> Self {
        let mut app = App {
            watchlist,
            table: Snapshot::new(),
            rows: Vec::new(),
            lines: Vec::new(),
            banner: None,
            input_mode: InputMode::Normal,
            pending: 0,
            last_update: None,
            refresh_interval,
            last_tick: Instant::now(),
        };
        app.rebuild_view();
        app
    }

    pub fn is_fetching(&self) -> bool {
        self.pending > 0
    }

    /// Periodic refresh command, if one is due and nothing is in flight.
    pub fn tick(&mut self) -> Option<WorkerCommand> {
        if self.is_fetching() || self.last_tick.elapsed() < self.refresh_interval {
            return None;
        }
        Some(self.begin(WorkerCommand::Refresh { force: false }))
    }

    /// Marks a command as in flight. Every command sent to the worker goes through here.
    pub fn begin(&mut self, command: WorkerCommand) -> WorkerCommand {
        self.pending += 1;
        self.last_tick = Instant::now();
        command
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        self.pending = self.pending.saturating_sub(1);
        match event {
            WorkerEvent::Refreshed(report) => self.apply_report(report),
            WorkerEvent::AlreadyTracked(symbol) => {
                self.banner = Some(format!("{} is already on the watchlist", symbol));
            }
            WorkerEvent::Rejected { input, reason } => {
                self.banner = Some(format!("Can't add {:?}: {}", input, reason));
            }
        }
    }

    fn apply_report(&mut self, report: RefreshReport) {
        self.banner = report.notice.map(|notice| match notice {
            Notice::StaleDataServed => "Showing cached data (provider unavailable)".to_string(),
            Notice::NoDataAvailable => "No data available".to_string(),
        });
        self.watchlist = report.watchlist;
        self.table = report.table;
        self.last_update = Some(Local::now());
        self.rebuild_view();
    }

    fn rebuild_view(&mut self) {
        self.rows = price_rows(&self.watchlist, &self.table);
        self.lines = trend_lines(&self.watchlist, &self.table);
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Action {
        let busy = self.is_fetching();
        match &mut self.input_mode {
            InputMode::Normal => match key {
                KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
                KeyCode::Char('r') if !busy => {
                    Action::Send(self.begin(WorkerCommand::Refresh { force: true }))
                }
                KeyCode::Char('a') => {
                    self.input_mode = InputMode::AddSymbol(String::new());
                    Action::None
                }
                _ => Action::None,
            },
            InputMode::AddSymbol(text) => match key {
                KeyCode::Esc => {
                    self.input_mode = InputMode::Normal;
                    Action::None
                }
                KeyCode::Enter => {
                    let input = text.trim().to_string();
                    self.input_mode = InputMode::Normal;
                    if input.is_empty() {
                        Action::None
                    } else {
                        Action::Send(self.begin(WorkerCommand::AddSymbol(input)))
                    }
                }
                KeyCode::Backspace => {
                    text.pop();
                    Action::None
                }
                KeyCode::Char(c) if !c.is_whitespace() => {
                    text.push(c.to_ascii_uppercase());
                    Action::None
                }
                _ => Action::None,
            },
        }
    }
}
