use std::path::PathBuf;
use std::process::ExitCode;

use aiomixer_core::{open_device, AppConfig, Flow, Session, DEFAULT_MIXER_DEVICE};
use clap::Parser;
use crossterm::{event, terminal};
use tracing_subscriber::EnvFilter;

mod keymap;
mod ui;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("aiomixer: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> aiomixer_core::Result<()> {
    let config = AppConfig::with_device(&cli.device);
    tracing::info!(device = ?config.device, "starting mixer");

    let device = open_device(&config.device)?;
    let size = terminal::size()?;
    let mut session = Session::open(device, &config, size.1)?;

    let _terminal = ui::TerminalGuard::enter()?;
    let mut screen = ui::Screen::new(std::io::stdout(), config.layout, size);

    let start = session.start();
    screen.apply(session.catalog(), &start.effects)?;

    loop {
        let event = event::read()?;
        if let event::Event::Resize(width, height) = event {
            screen.resize(width, height);
        }
        let Some(key) = keymap::translate(&event) else {
            continue;
        };

        let transition = session.handle(key);
        screen.apply(session.catalog(), &transition.effects)?;
        if transition.flow == Flow::Quit {
            tracing::info!("quitting");
            return Ok(());
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive terminal audio mixer", long_about = None)]
struct Cli {
    /// Mixer device to open. A `.json` file is loaded as a mixer snapshot.
    #[arg(short, long, default_value = DEFAULT_MIXER_DEVICE)]
    device: PathBuf,
}
