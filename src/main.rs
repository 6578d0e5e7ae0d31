use std::{
    fs::OpenOptions,
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use webbrowser::Browser;

use cstrafe::{
    app::{App, Control},
    clock::SessionClock,
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    server,
    sink::{LatestShot, LogSink},
    ClassificationPolicy, InputSession, MovementClassifier,
};

const TICK_RATE_MS: u64 = 100;

/// counter-strafe trainer: shows how cleanly you stopped before every shot
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Counter-strafe trainer. Hold and swap your strafe keys, click to shoot, \
                  and every shot is graded: run & gun, a clean overlap, a gap, or a static shot."
)]
pub struct Cli {
    /// broadcast every shot to browser clients (e.g. an OBS browser source) over a websocket
    #[clap(long)]
    server: bool,

    /// address the HUD server binds to
    #[clap(long)]
    host: Option<String>,

    /// port the HUD server listens on
    #[clap(short = 'p', long)]
    port: Option<u16>,

    /// open the HUD page in the default browser (server mode only)
    #[clap(long)]
    open: bool,

    /// how shots are colored
    #[clap(long, value_enum)]
    policy: Option<ClassificationPolicy>,

    /// config file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// write logs to this file (RUST_LOG sets the level)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Command line values win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
    }

    fn server_mode(&self) -> bool {
        self.server || exe_requests_server(std::env::args_os().next().as_deref().map(Path::new))
    }
}

/// A binary renamed to contain "server" starts in server mode.
fn exe_requests_server(exe: Option<&Path>) -> bool {
    exe.and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().to_lowercase().contains("server"))
        .unwrap_or(false)
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    // the terminal is in raw mode, so stay quiet unless asked
    let default_filter = if log_file.is_some() { "info" } else { "off" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}

fn hud_url(addr: std::net::SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("http://127.0.0.1:{}", addr.port())
    } else {
        format!("http://{addr}")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.log_file.as_deref())?;

    let store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let mut config = store.load();
    cli.apply(&mut config);
    if cli.save_config {
        store
            .save(&config)
            .with_context(|| format!("saving config to {}", store.path().display()))?;
        info!("saved config to {}", store.path().display());
    }

    let latest = LatestShot::new();
    let mut session = InputSession::new(MovementClassifier::new(config.thresholds, config.policy))
        .with_sink(latest.clone())
        .with_sink(LogSink);

    let mut hud_addr = None;
    if cli.server_mode() {
        let (hub, addr) = server::spawn(config.server.addr()?)?;
        session = session.with_sink(hub);
        hud_addr = Some(addr);
        if cli.open && Browser::is_available() {
            if let Err(e) = webbrowser::open(&hud_url(addr)) {
                warn!("could not open browser: {e}");
            }
        }
    }

    let mut app = App::new(Arc::new(session), latest, config.bindings);
    app.hud_addr = hud_addr;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    app.releases_reported = supports_keyboard_enhancement().unwrap_or(false);
    if app.releases_reported {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    } else {
        warn!("terminal does not report key release events");
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, SessionClock::start());

    if app.releases_reported {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    clock: SessionClock,
) -> anyhow::Result<()> {
    let runner = Runner::new(
        CrosstermEventSource::new(clock),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    loop {
        match app.handle_event(runner.step()) {
            Control::Quit => break,
            Control::Redraw => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            Control::Continue => {}
        }
    }

    Ok(())
}
