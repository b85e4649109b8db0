//! cityweather - current weather for a city from the command line
//!
//! Resolves every city given on the command line concurrently and prints the
//! results, or shows them in a full-screen terminal view with `--tui`.

use std::fs::{self, OpenOptions};
use std::io;
use std::panic;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use cityweather::cache::CacheStore;
use cityweather::cli::Cli;
use cityweather::config::{Config, Units};
use cityweather::data::WeatherClient;
use cityweather::request_log::{RequestLog, TracingLog};
use cityweather::{ui, FetchOutcome, WeatherResolver};

/// Sets up a panic hook that restores the terminal before printing the panic message.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Installs the tracing subscriber
///
/// Events go to the configured log file, or to stderr. The terminal view
/// without a log file gets no subscriber so nothing is drawn over it.
fn init_logging(config: &Config, tui: bool) -> io::Result<()> {
    match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cityweather=info".into());
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if tui => {}
        None => {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cityweather=warn".into());
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Shows the outcomes full-screen until the user quits
fn run_tui(outcomes: &[FetchOutcome], units: Units) -> io::Result<()> {
    setup_panic_hook();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = (|| -> io::Result<()> {
        loop {
            terminal.draw(|f| ui::render_reports(f, outcomes, units))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) || ctrl_c {
                        return Ok(());
                    }
                }
            }
        }
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    result
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let cities = cli.city_names()?;

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    init_logging(&config, cli.tui)?;
    tracing::debug!(?config, "configuration loaded");

    let log: Arc<dyn RequestLog> = Arc::new(TracingLog);
    let client = WeatherClient::new(&config, log.clone())?;
    let cache = CacheStore::new(&config.cache_dir, config.cache_ttl);
    let resolver = WeatherResolver::new(cache, client, log);

    let outcomes =
        futures::future::join_all(cities.iter().map(|city| resolver.resolve(city))).await;

    if cli.tui {
        run_tui(&outcomes, config.units)?;
    } else {
        let mut stdout = io::stdout().lock();
        let mut stderr = io::stderr().lock();
        for outcome in &outcomes {
            ui::write_plain(&mut stdout, &mut stderr, outcome, config.units)?;
        }
    }

    Ok(outcomes.iter().all(|o| o.report().is_some()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
