use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use deckview::app::{Viewer, run_viewer};
use deckview::event_source::TerminalEventSource;

#[derive(Parser, Debug)]
#[command(name = "deckview", about = "A terminal PDF presentation viewer")]
struct Cli {
    /// Slide folder containing config.json and the deck PDF
    folder: PathBuf,

    /// Slide identifier recorded in the address fragment
    #[arg(long)]
    slide: Option<String>,

    /// Initial page (1-based); overrides a restored session
    #[arg(long)]
    page: Option<usize>,

    /// Physical-to-logical pixel ratio of the output device
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f32,

    /// Log file path
    #[arg(long, default_value = "deckview.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        File::create(&cli.log_file)?,
    )?;

    info!("Starting deckview for {}", cli.folder.display());

    let mut viewer = match Viewer::open(&cli.folder, cli.slide, cli.page, cli.pixel_ratio) {
        Ok(viewer) => viewer,
        Err(e) => {
            // Fatal startup errors are surfaced before the terminal is
            // switched to the alternate screen.
            error!("startup failed: {e}");
            eprintln!("deckview: {e}");
            std::process::exit(1);
        }
    };

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let mut events = TerminalEventSource;
    let res = run_viewer(&mut terminal, &mut events, &mut viewer);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {:?}", err);
        println!("{err:?}");
    }

    info!("Shutting down deckview");
    Ok(())
}
