use anyhow::Context;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use weed_atlas::api::ApiClient;
use weed_atlas::colors::{ChoroplethColorer, Palette};
use weed_atlas::config::Config;
use weed_atlas::controller::{MapEvent, MapViewController};
use weed_atlas::fetcher::{AppMessage, Fetcher};
use weed_atlas::pdf::Branding;
use weed_atlas::state::AppState;
use weed_atlas::ui;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // terminal należy do TUI, logi idą do pliku
    let log_file = File::create(&config.log_file)
        .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("weed_atlas=info".parse()?))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    config.log_summary();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let api = ApiClient::new(&config)?;
    let (fetcher, rx) = Fetcher::new(api, runtime.handle().clone());

    let palette = Palette::load_or_default(&config.data_dir)?;
    let controller = MapViewController::new(ChoroplethColorer::new(&palette)?);
    let branding = Branding::load(&config.data_dir);
    let mut state = AppState::new(controller, config.export_dir.clone(), branding);
    state.dispatch(MapEvent::Mount);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut state, &fetcher, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    if let Err(err) = &result {
        tracing::error!(error = %err, "Exiting after error");
    }
    result
}

fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
    fetcher: &Fetcher,
    mut rx: UnboundedReceiver<AppMessage>,
) -> anyhow::Result<()> {
    loop {
        let (commands, species_commands) = state.take_commands();
        fetcher.run_all(commands);
        for command in species_commands {
            fetcher.run_species(command);
        }

        terminal.draw(|f| ui::draw(f, state))?;

        while let Ok(message) = rx.try_recv() {
            state.apply(message);
        }

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                    if state.handle_input(code) {
                        tracing::info!("Quit requested");
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse),
                _ => {}
            }
        }
    }
}
