use crate::output::{list_line, print_json, terminal_summary, SessionRecord};
use crate::App;
use anyhow::{bail, Result};
use clap::Args;
use ghostmux_core::config::{current_surface, SURFACE_ENV};
use ghostmux_core::{CreateTerminalRequest, Location};
use serde_json::json;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Shells rewrite the title during startup; setting ours earlier gets lost.
const TITLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Create a new window (default)
    #[arg(long, conflicts_with = "tab")]
    pub window: bool,
    /// Create a new tab
    #[arg(long)]
    pub tab: bool,
    #[arg(long)]
    pub cwd: Option<String>,
    /// Title applied once the shell has started
    #[arg(long)]
    pub title: Option<String>,
    /// Command to run after shell init
    #[arg(long)]
    pub command: Option<String>,
    /// Environment variable as KEY=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
    /// Parent terminal UUID (for tabs)
    #[arg(long)]
    pub parent: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct KillArgs {
    #[arg(short = 't', long = "target")]
    pub target: String,
    /// Close without asking the terminal for confirmation
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FocusArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetTitleArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct SetBgArgs {
    #[arg(short = 't', long = "target")]
    pub target: String,
    /// Any color the terminal understands, e.g. `#1e1e2e` or `rgb:1e/1e/2e`
    pub color: String,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    /// Capture the whole screen including scrollback
    #[arg(long, conflicts_with = "selection")]
    pub all: bool,
    /// Capture the current selection
    #[arg(long)]
    pub selection: bool,
    /// First line to print; negative counts from the end
    #[arg(short = 'S', long = "start", allow_hyphen_values = true)]
    pub start: Option<i64>,
    /// Last line to print (inclusive); negative counts from the end
    #[arg(short = 'E', long = "end", allow_hyphen_values = true)]
    pub end: Option<i64>,
    #[arg(long)]
    pub json: bool,
}

pub fn list(app: &App, args: &ListArgs) -> Result<()> {
    let sessions = app.client().list_terminals()?;
    if args.json {
        let records: Vec<SessionRecord> = sessions.iter().map(SessionRecord::from).collect();
        return print_json(&json!({ "terminals": records }));
    }
    if sessions.is_empty() {
        println!("(no terminals)");
        return Ok(());
    }
    let me = current_surface();
    for session in &sessions {
        println!("{}", list_line(session, me.as_deref()));
    }
    Ok(())
}

pub fn status(app: &App) -> Result<()> {
    let socket = app.client().socket_path().display().to_string();
    if !app.client().is_available() {
        bail!("Ghostty API not available at {socket}");
    }
    println!("Ghostty API available at {socket}");
    Ok(())
}

pub fn new_surface(app: &App, args: &NewArgs) -> Result<()> {
    let location = if args.tab {
        Some(Location::Tab)
    } else if args.window {
        Some(Location::Window)
    } else {
        None
    };
    let request = CreateTerminalRequest {
        location,
        working_directory: args.cwd.clone(),
        command: args.command.clone(),
        env: env_map(&args.env),
        parent: args.parent.clone(),
    };
    let session = app.client().create_terminal(&request)?;

    let title_error = match &args.title {
        Some(title) if has_control_sequences(title) => {
            Some("title contains invalid characters (escape or bell)".to_string())
        }
        Some(title) => {
            thread::sleep(TITLE_DELAY);
            app.client()
                .set_title(&session.id, title)
                .err()
                .map(|err| format!("failed to set title: {err}"))
        }
        None => None,
    };

    if args.json {
        let mut record = serde_json::to_value(SessionRecord::from(&session))?;
        if let Some(title_error) = &title_error {
            record["title_error"] = json!(title_error);
        }
        return print_json(&record);
    }

    println!("{}", terminal_summary(&session, "Created surface"));
    if let Some(title_error) = title_error {
        warn!(event = "title_not_set", terminal = %session.id, reason = %title_error);
        eprintln!("warning: {title_error}");
    }
    Ok(())
}

pub fn kill(app: &App, args: &KillArgs) -> Result<()> {
    let session = app.resolve(&args.target)?;
    app.client().delete_terminal(&session.id, args.force)?;
    if args.json {
        return print_json(&json!({ "success": true, "id": session.id }));
    }
    println!("killed {} ({})", session.name(), session.short_id());
    Ok(())
}

pub fn focus(app: &App, args: &FocusArgs) -> Result<()> {
    let session = app.resolve_required(args.target.as_deref(), "focus")?;
    app.client().focus_terminal(&session.id)?;
    println!("focused {} ({})", session.name(), session.short_id());
    Ok(())
}

pub fn set_title(app: &App, args: &SetTitleArgs) -> Result<()> {
    if has_control_sequences(&args.title) {
        bail!("title contains invalid characters (escape or bell)");
    }
    let session = app.resolve_required(args.target.as_deref(), "set-title")?;
    app.client().set_title(&session.id, &args.title)?;
    Ok(())
}

pub fn set_bg(app: &App, args: &SetBgArgs) -> Result<()> {
    let color = args.color.trim();
    if color.is_empty() || color.chars().any(char::is_control) {
        bail!("invalid color: {:?}", args.color);
    }
    let session = app.resolve(&args.target)?;
    app.client()
        .send_output(&session.id, &background_sequence(color))?;
    Ok(())
}

pub fn capture_pane(app: &App, args: &CaptureArgs) -> Result<()> {
    let session = app.resolve_required(args.target.as_deref(), "capture-pane")?;
    let contents = if args.selection {
        app.client()
            .get_selection_contents(&session.id)?
            .unwrap_or_default()
    } else if args.all {
        app.client().get_screen_contents(&session.id)?
    } else {
        app.client().get_visible_contents(&session.id)?
    };
    let contents = slice_lines(&contents, args.start, args.end);

    if args.json {
        return print_json(&json!({ "id": session.id, "contents": contents }));
    }
    if !contents.is_empty() {
        println!("{contents}");
    }
    Ok(())
}

pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err("env must be in KEY=VALUE form".to_string());
    };
    if key.is_empty() {
        return Err("env key must be non-empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Later duplicates win; an empty list sends no `env` at all.
pub fn env_map(pairs: &[(String, String)]) -> Option<BTreeMap<String, String>> {
    if pairs.is_empty() {
        return None;
    }
    Some(pairs.iter().cloned().collect())
}

fn has_control_sequences(text: &str) -> bool {
    text.contains('\u{1b}') || text.contains('\u{07}')
}

fn background_sequence(color: &str) -> String {
    format!("\u{1b}]11;{color}\u{1b}\\")
}

/// Keeps lines `start..=end`. Negative positions count back from the last
/// line; out-of-range positions are clamped.
fn slice_lines(contents: &str, start: Option<i64>, end: Option<i64>) -> String {
    if start.is_none() && end.is_none() {
        return contents.to_string();
    }
    let lines: Vec<&str> = contents.lines().collect();
    let Some(last) = lines.len().checked_sub(1) else {
        return String::new();
    };
    let position = |value: i64| -> i64 {
        let index = if value < 0 {
            lines.len() as i64 + value
        } else {
            value
        };
        index.clamp(0, last as i64)
    };
    let from = start.map(position).unwrap_or(0);
    let to = end.map(position).unwrap_or(last as i64);
    if from > to {
        return String::new();
    }
    lines[from as usize..=to as usize].join("\n")
}
