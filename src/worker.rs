//! Background refresh thread.
//!
//! The controller lives on its own thread and is driven by `WorkerCommand`s, so the
//! blocking HTTP call and file I/O never stall the UI and only one refresh ever runs at
//! a time. That thread is also the only writer of the cache file.

use crate::config::save_watchlist;
use crate::controller::{Notice, Refresh, RefreshController};
use crate::models::{Snapshot, Watchlist};
use crate::provider::QuoteProvider;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCommand {
    Refresh { force: bool },
    AddSymbol(String),
    Shutdown,
}

/// What the UI needs to redraw after a command completes.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub outcome: &'static str,
    pub notice: Option<Notice>,
    pub table: Snapshot,
    pub watchlist: Watchlist,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A refresh ran (directly, or because a symbol was added).
    Refreshed(RefreshReport),
    /// The symbol was already tracked; nothing was fetched.
    AlreadyTracked(String),
    /// Input couldn't be used as a symbol.
    Rejected { input: String, reason: String },
}

pub struct RefreshWorker {
    commands: Sender<WorkerCommand>,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshWorker {
    /// Starts the thread. When `watchlist_path` is set, added symbols are written back to it.
    pub fn spawn<P>(controller: RefreshController<P>, watchlist_path: Option<PathBuf>) -> Self
    where
        P: QuoteProvider + Send + 'static,
    {
        let (commands, command_rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();

        let handle = thread::spawn(move || run(controller, watchlist_path, command_rx, event_tx));

        Self {
            commands,
            events,
            handle: Some(handle),
        }
    }

    /// Returns false if the worker thread has gone away.
    pub fn send(&self, command: WorkerCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Non-blocking drain, for the UI loop.
    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    /// Blocking receive. `None` once the worker has stopped.
    pub fn recv(&self) -> Option<WorkerEvent> {
        self.events.recv().ok()
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("refresh worker panicked");
            }
        }
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<P: QuoteProvider>(
    mut controller: RefreshController<P>,
    watchlist_path: Option<PathBuf>,
    commands: Receiver<WorkerCommand>,
    events: Sender<WorkerEvent>,
) {
    for command in commands {
        debug!(?command, "worker received command");
        let event = match command {
            WorkerCommand::Shutdown => break,
            WorkerCommand::Refresh { force } => {
                let outcome = controller.refresh(force);
                WorkerEvent::Refreshed(report(&controller, &outcome))
            }
            WorkerCommand::AddSymbol(input) => match controller.add_symbol(&input) {
                Ok(Some(outcome)) => {
                    if let Some(path) = &watchlist_path {
                        if let Err(err) = save_watchlist(path, controller.watchlist()) {
                            warn!(error = %err, "could not save watchlist");
                        }
                    }
                    WorkerEvent::Refreshed(report(&controller, &outcome))
                }
                Ok(None) => WorkerEvent::AlreadyTracked(input.trim().to_ascii_uppercase()),
                Err(err) => WorkerEvent::Rejected {
                    input,
                    reason: err.to_string(),
                },
            },
        };

        if events.send(event).is_err() {
            break;
        }
    }
    debug!("refresh worker stopped");
}

fn report<P: QuoteProvider>(controller: &RefreshController<P>, outcome: &Refresh) -> RefreshReport {
    RefreshReport {
        outcome: outcome.label(),
        notice: outcome.notice(),
        table: controller.table().clone(),
        watchlist: controller.watchlist().clone(),
    }
}
