//! TUI entrypoint: closes an autapse around a synthetic cell and runs it in real time.
//! Controls: [s] Step, [r] Run/Pause, [a] Active, [l] Acquire, [c] Next cell,
//! [+/-] bias, [ / ] halve / double the period, [q] Quit

mod app;
mod backend;
mod settings;
mod sink;
mod ui;

use anyhow::{Context, Result};
use app::App;
use autapse_rt::AutapseRuntime;
use backend::LifCell;
use clap::Parser;
use settings::Settings;
use sink::CsvSink;
use ui::draw;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute, terminal,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "autapse-tui", about = "Real-time autapse dynamic clamp on a synthetic cell")]
struct Cli {
    /// TOML settings file with [host] and [protocol] tables
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the tick period (µs)
    #[arg(long)]
    period_us: Option<f64>,
    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "autapse-tui.log")]
    log_file: PathBuf,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file: {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    // Leave alternate screen and show cursor
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(period_us) = cli.period_us {
        settings.host.period_us = period_us;
    }
    settings.validate()?;
    tracing::info!(host = ?settings.host, "starting host");

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Ensure terminal is restored on panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    // App state
    let sink = CsvSink::new(&settings.host.output_dir);
    let runtime = AutapseRuntime::new(
        settings.protocol.clone(),
        settings.host.period_us,
        settings.host.capacity,
        sink,
    );
    let cell = LifCell::new(settings.host.bias_pa);
    let mut app = App::new(cell, runtime);

    let frame = Duration::from_millis(50);
    let mut last_frame = Instant::now();

    // Event loop
    loop {
        draw(&mut terminal, &app)?;

        let timeout = frame
            .checked_sub(last_frame.elapsed())
            .unwrap_or(Duration::from_millis(0));

        if event::poll(timeout)? {
            if let CEvent::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char('s') => app.step(),
                    KeyCode::Char('r') => app.toggle_running(),
                    KeyCode::Char('a') => app.toggle_active(),
                    KeyCode::Char('l') => app.toggle_acquire(),
                    KeyCode::Char('c') => app.next_cell(),
                    KeyCode::Char('+') => app.adjust_bias(10.0),
                    KeyCode::Char('-') => app.adjust_bias(-10.0),
                    KeyCode::Char('[') => app.set_period(app.runtime.dt() * 1e6 / 2.0),
                    KeyCode::Char(']') => app.set_period(app.runtime.dt() * 1e6 * 2.0),
                    _ => {}
                }
            }
        }

        let elapsed = last_frame.elapsed();
        if elapsed >= frame {
            if app.running {
                // catch up on the wall time that passed since the last frame,
                // at most one second of simulated time per frame
                let ticks = (elapsed.as_secs_f64().min(1.0) / app.runtime.dt()).round() as u64;
                app.advance(ticks);
            }
            last_frame = Instant::now();
        }
    }

    // Cleanup
    restore_terminal()?;
    tracing::info!(ticks = app.tick, "host stopped");
    Ok(())
}
