use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc::{self, Sender},
    thread,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use repcount::{
    app::{App, Control, TICK_RATE_MS},
    config::{Config, ConfigStore, DropoutPolicy, FileConfigStore},
    exercise::Exercise,
    feedback::TerminalBell,
    logging,
    runtime::{spawn_terminal_events, AppEvent, ChannelEventSource, FixedTicker, Runner},
    source::{InputSpec, RecordingFormat},
};

/// count exercise reps from body-pose landmarks in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Counts push-ups, squats, curls and lunges from a stream of body-pose landmarks. Without --input a synthetic pose stream is used."
)]
pub struct Cli {
    /// exercise to count (defaults to the last one used)
    #[clap(short = 'e', long, value_enum)]
    exercise: Option<Exercise>,

    /// recorded landmark stream to replay instead of the synthetic one
    #[clap(short = 'i', long)]
    input: Option<PathBuf>,

    /// format of --input (guessed from the extension when omitted)
    #[clap(long, value_enum, requires = "input")]
    format: Option<RecordingFormat>,

    /// frames per second to pull from the source
    #[clap(long)]
    fps: Option<u32>,

    /// seed for the synthetic stream
    #[clap(long, conflicts_with = "input")]
    seed: Option<u64>,

    /// what a lost detection does to a half-finished rep
    #[clap(long, value_enum)]
    dropout_policy: Option<DropoutPolicy>,

    /// disable the terminal bell
    #[clap(long)]
    no_sound: bool,

    /// write logs here instead of the default state directory
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// start counting immediately
    #[clap(long)]
    autostart: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(exercise) = self.exercise {
            config.exercise = exercise;
        }
        if let Some(fps) = self.fps {
            config.capture.fps = fps.max(1);
        }
        if let Some(policy) = self.dropout_policy {
            config.dropout_policy = policy;
        }
        if self.no_sound {
            config.sound = false;
        }
    }

    fn input_spec(&self) -> InputSpec {
        match &self.input {
            Some(path) => InputSpec::recording(path.clone(), self.format),
            None => InputSpec::Synthetic { seed: self.seed },
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = logging::init(cli.log_file.as_deref());

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    info!(?log_path, config = %store.path().display(), "repcount starting");

    let (tx, rx) = mpsc::channel();
    spawn_terminal_events(tx.clone());
    spawn_ticker(tx.clone());

    let mut app = App::new(
        config,
        cli.input_spec(),
        tx,
        Box::new(TerminalBell::stdout(true)),
    );
    if cli.autostart {
        app.start();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.stop();
    // Only the selected exercise and sound toggle carry between runs
    let mut saved = store.load();
    saved.exercise = app.config.exercise;
    if !cli.no_sound {
        saved.sound = app.config.sound;
    }
    if let Err(e) = store.save(&saved) {
        warn!("could not save config to {}: {e}", store.path().display());
    }
    info!(reps = app.state().rep_count(), "repcount exiting");

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<ChannelEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let event = runner.step();
        if app.handle(event) == Control::Quit {
            break;
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

/// Redraw ticks keep coming even while frames saturate the channel.
fn spawn_ticker(tx: Sender<AppEvent>) {
    thread::spawn(move || loop {
        if tx.send(AppEvent::Tick).is_err() {
            break;
        }
        thread::sleep(Duration::from_millis(TICK_RATE_MS));
    });
}
