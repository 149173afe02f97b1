use anyhow::{ensure, Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};
use stock_watch::{
    app::{Action, App},
    config::{self, Settings},
    logging,
    ui,
    worker::{RefreshWorker, WorkerCommand},
    CacheStore, RefreshController, RefreshSettings, YahooProvider,
};
use tracing::info;

fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    logging::init(&settings.log_path)
        .with_context(|| format!("opening log file {}", settings.log_path.display()))?;
    info!(cache = %settings.cache_path.display(), "starting stock-watch");

    let watchlist = config::load_watchlist(&settings.watchlist_path)?;
    let provider = YahooProvider::new(settings.request_timeout)?;
    let controller = RefreshController::new(
        provider,
        CacheStore::new(&settings.cache_path),
        watchlist.clone(),
        RefreshSettings {
            max_age: settings.max_age,
            window: settings.window,
        },
    );
    let worker = RefreshWorker::spawn(controller, Some(settings.watchlist_path.clone()));
    let mut app = App::new(watchlist, settings.refresh_interval);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &worker);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    worker.shutdown();

    if let Err(err) = res {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App, worker: &RefreshWorker) -> Result<()> {
    // Cache first on startup; the provider is only asked if the snapshot has expired.
    dispatch(worker, app.begin(WorkerCommand::Refresh { force: false }))?;

    loop {
        while let Some(event) = worker.try_recv() {
            app.apply(event);
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if let Some(command) = app.tick() {
            dispatch(worker, command)?;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(key.code) {
                    Action::Quit => return Ok(()),
                    Action::Send(command) => dispatch(worker, command)?,
                    Action::None => {}
                }
            }
        }
    }
}

fn dispatch(worker: &RefreshWorker, command: WorkerCommand) -> Result<()> {
    ensure!(worker.send(command), "refresh worker stopped unexpectedly");
    Ok(())
}
