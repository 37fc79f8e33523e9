use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use ghostmux_core::config::SURFACE_ENV;
use ghostmux_core::{resolve_target, ClientConfig, GhosttyClient, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod chat;
mod input;
mod metadata;
mod output;
mod pane;
mod statusbar;
mod surface;

const LOG_LEVEL_ENV: &str = "GHOSTMUX_LOG_LEVEL";

#[derive(Parser, Debug)]
#[command(name = "ghostmux")]
#[command(about = "Ghostty CLI over the local API socket", long_about = None)]
#[command(version)]
struct Cli {
    /// API socket path (overrides $GHOSTTY_API_SOCKET)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// List all terminals
    #[command(aliases = ["list-sessions", "ls"])]
    ListSurfaces(surface::ListArgs),
    /// Check Ghostty API availability
    Status,
    /// Create a new terminal window or tab
    #[command(alias = "new-surface")]
    New(surface::NewArgs),
    /// Create a new pane by splitting
    #[command(aliases = ["splitp", "split-pane"])]
    NewPane(pane::NewPaneArgs),
    /// Create a grid of panes (e.g. 3x2 for 6 panes)
    #[command(alias = "grid")]
    PanesGrid(pane::GridArgs),
    /// Get pane dimensions
    #[command(aliases = ["pane-size", "size"])]
    GetPaneSize(pane::SizeArgs),
    /// Resize a pane
    #[command(alias = "resizep")]
    ResizePane(pane::ResizeArgs),
    /// Make all panes equal size
    #[command(aliases = ["equalize", "eq"])]
    EqualizePanes(pane::EqualizeArgs),
    /// Close a terminal
    #[command(alias = "kill")]
    KillSurface(surface::KillArgs),
    /// Focus a terminal
    #[command(alias = "select-pane")]
    Focus(surface::FocusArgs),
    /// Set terminal background color
    SetBg(surface::SetBgArgs),
    /// Send text followed by Enter
    SendKeys(input::SendKeysArgs),
    /// Send a single key without Enter
    SendKey(input::SendKeyArgs),
    /// Set terminal title
    SetTitle(surface::SetTitleArgs),
    /// Control the programmable status bar
    Statusbar {
        #[command(subcommand)]
        action: statusbar::StatusBarCommand,
    },
    /// Get, set or delete terminal metadata
    Metadata {
        #[command(subcommand)]
        action: metadata::MetadataCommand,
    },
    /// Capture pane contents (visible only by default)
    #[command(alias = "capturep")]
    CapturePane(surface::CaptureArgs),
    /// Message other agents running in Ghostty terminals
    Chat {
        #[command(subcommand)]
        action: chat::ChatCommand,
    },
}

/// Per-invocation state shared by every command.
pub struct App {
    client: GhosttyClient,
}

impl App {
    pub fn new(client: GhosttyClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GhosttyClient {
        &self.client
    }

    pub fn resolve(&self, target: &str) -> Result<Session> {
        let sessions = self.client.list_terminals()?;
        match resolve_target(target, &sessions) {
            Some(session) => Ok(session.clone()),
            None => bail!("can't find terminal: {target}"),
        }
    }

    /// Resolves `-t`, which clap already filled from `$GHOSTTY_SURFACE_UUID`
    /// when the flag was omitted.
    pub fn resolve_required(&self, target: Option<&str>, command: &str) -> Result<Session> {
        match target {
            Some(target) => self.resolve(target),
            None => bail!("{command} requires -t <target> or ${SURFACE_ENV}"),
        }
    }
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        let mut command = Cli::command();
        if command.print_help().is_ok() {
            println!();
        }
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(event = "command_failed", error = ?err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(socket) = cli.socket {
        config = config.with_socket_path(socket);
    }
    debug!(
        event = "client_config",
        socket = %config.socket_path.display(),
        auto_launch = config.auto_launch
    );
    let app = App::new(GhosttyClient::new(config));

    match cli.command {
        Commands::ListSurfaces(args) => surface::list(&app, &args),
        Commands::Status => surface::status(&app),
        Commands::New(args) => surface::new_surface(&app, &args),
        Commands::NewPane(args) => pane::new_pane(&app, &args),
        Commands::PanesGrid(args) => pane::panes_grid(&app, &args),
        Commands::GetPaneSize(args) => pane::pane_size(&app, &args),
        Commands::ResizePane(args) => pane::resize_pane(&app, &args),
        Commands::EqualizePanes(args) => pane::equalize_panes(&app, &args),
        Commands::KillSurface(args) => surface::kill(&app, &args),
        Commands::Focus(args) => surface::focus(&app, &args),
        Commands::SetBg(args) => surface::set_bg(&app, &args),
        Commands::SendKeys(args) => input::send_keys(&app, &args),
        Commands::SendKey(args) => input::send_key(&app, &args),
        Commands::SetTitle(args) => surface::set_title(&app, &args),
        Commands::Statusbar { action } => statusbar::handle_statusbar_command(&app, action),
        Commands::Metadata { action } => metadata::handle_metadata_command(&app, action),
        Commands::CapturePane(args) => surface::capture_pane(&app, &args),
        Commands::Chat { action } => chat::handle_chat_command(&app, action),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
        level
    } else {
        "warn".to_string()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
