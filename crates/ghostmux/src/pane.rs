use crate::output::{print_json, terminal_summary, SessionRecord};
use crate::surface::{env_map, parse_env_pair};
use crate::App;
use anyhow::{anyhow, bail, Result};
use clap::Args;
use ghostmux_core::config::SURFACE_ENV;
use ghostmux_core::{CreateTerminalRequest, Location, SplitDirection};
use serde::Serialize;
use serde_json::json;
use tracing::info;

const MAX_GRID_SIDE: u32 = 10;
const DEFAULT_RESIZE_PIXELS: u32 = 50;
const EQUALIZE_ACTION: &str = "equalize_splits";

#[derive(Args, Debug)]
pub struct NewPaneArgs {
    /// Terminal to split; without it the focused terminal is split
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    #[arg(short = 'd', long = "direction", default_value = "right")]
    pub direction: SplitDirection,
    #[arg(long)]
    pub cwd: Option<String>,
    #[arg(long)]
    pub command: Option<String>,
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GridArgs {
    /// Grid size as <columns>x<rows>, e.g. 3x2
    #[arg(value_parser = parse_grid)]
    pub grid: Grid,
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    #[arg(long)]
    pub cwd: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SizeArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ResizeArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    #[arg(short = 'd', long = "direction")]
    pub direction: SplitDirection,
    /// Amount in pixels
    #[arg(
        short = 'a',
        long = "amount",
        default_value_t = DEFAULT_RESIZE_PIXELS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub amount: u32,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EqualizeArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub columns: u32,
    pub rows: u32,
}

#[derive(Debug, Serialize)]
struct GridReport {
    columns: u32,
    rows: u32,
    total_panes: u32,
    panes: Vec<Vec<String>>,
}

pub fn new_pane(app: &App, args: &NewPaneArgs) -> Result<()> {
    let parent = match &args.target {
        Some(target) => Some(app.resolve(target)?.id),
        None => None,
    };
    let request = CreateTerminalRequest {
        location: Some(Location::Split(args.direction)),
        working_directory: args.cwd.clone(),
        command: args.command.clone(),
        env: env_map(&args.env),
        parent,
    };
    let session = app.client().create_terminal(&request)?;
    if args.json {
        return print_json(&SessionRecord::from(&session));
    }
    println!("{}", terminal_summary(&session, "Created pane"));
    Ok(())
}

/// Splits rows downward first, then columns rightward within each row, so
/// the split tree stays balanced before equalizing.
pub fn panes_grid(app: &App, args: &GridArgs) -> Result<()> {
    let Grid { columns, rows } = args.grid;
    let origin = match &args.target {
        Some(target) => app.resolve(target)?.id,
        None => app
            .client()
            .list_terminals()?
            .into_iter()
            .find(|session| session.focused)
            .map(|session| session.id)
            .ok_or_else(|| anyhow!("no focused terminal found"))?,
    };
    info!(event = "grid_build", origin = %origin, columns, rows);

    let split = |parent: &str, direction: SplitDirection| -> Result<String> {
        let request = CreateTerminalRequest {
            location: Some(Location::Split(direction)),
            working_directory: args.cwd.clone(),
            parent: Some(parent.to_string()),
            ..CreateTerminalRequest::default()
        };
        Ok(app.client().create_terminal(&request)?.id)
    };

    let mut row_starters = vec![origin.clone()];
    for _ in 1..rows {
        let parent = row_starters.last().cloned().unwrap_or_else(|| origin.clone());
        row_starters.push(split(&parent, SplitDirection::Down)?);
    }

    let mut panes = Vec::with_capacity(rows as usize);
    for starter in row_starters {
        let mut row = vec![starter];
        for _ in 1..columns {
            let parent = row.last().cloned().unwrap_or_default();
            row.push(split(&parent, SplitDirection::Right)?);
        }
        panes.push(row);
    }

    app.client().execute_action(&origin, EQUALIZE_ACTION)?;
    app.client().focus_terminal(&origin)?;

    let report = GridReport {
        columns,
        rows,
        total_panes: columns * rows,
        panes,
    };
    if args.json {
        return print_json(&report);
    }
    println!(
        "created {}x{} grid ({} panes)",
        report.columns, report.rows, report.total_panes
    );
    for (index, row) in report.panes.iter().enumerate() {
        let short: Vec<String> = row.iter().map(|id| ghostmux_core::short_id(id)).collect();
        println!("  row {}: {}", index + 1, short.join(" | "));
    }
    Ok(())
}

pub fn pane_size(app: &App, args: &SizeArgs) -> Result<()> {
    let target = app.resolve_required(args.target.as_deref(), "get-pane-size")?;
    let session = app.client().get_terminal(&target.id)?;
    if args.json {
        let mut output = json!({ "id": session.id });
        for (key, value) in [
            ("columns", session.columns),
            ("rows", session.rows),
            ("cell_width", session.cell_width),
            ("cell_height", session.cell_height),
        ] {
            if let Some(value) = value {
                output[key] = json!(value);
            }
        }
        return print_json(&output);
    }
    println!(
        "{}x{}",
        session.columns.unwrap_or(0),
        session.rows.unwrap_or(0)
    );
    Ok(())
}

pub fn resize_pane(app: &App, args: &ResizeArgs) -> Result<()> {
    let session = app.resolve_required(args.target.as_deref(), "resize-pane")?;
    app.client()
        .execute_action(&session.id, &resize_action(args.direction, args.amount))?;
    if args.json {
        return print_json(&json!({
            "success": true,
            "direction": args.direction.as_str(),
            "amount": args.amount,
        }));
    }
    println!("resized {} by {}px", args.direction, args.amount);
    Ok(())
}

pub fn equalize_panes(app: &App, args: &EqualizeArgs) -> Result<()> {
    let session = app.resolve_required(args.target.as_deref(), "equalize-panes")?;
    app.client().execute_action(&session.id, EQUALIZE_ACTION)?;
    if args.json {
        return print_json(&json!({ "success": true }));
    }
    println!("panes equalized");
    Ok(())
}

fn resize_action(direction: SplitDirection, amount: u32) -> String {
    format!("resize_split:{direction},{amount}")
}

fn parse_grid(raw: &str) -> Result<Grid> {
    let lower = raw.trim().to_lowercase();
    let parsed = lower
        .split_once('x')
        .and_then(|(columns, rows)| Some((columns.parse::<u32>().ok()?, rows.parse::<u32>().ok()?)))
        .filter(|(columns, rows)| *columns >= 1 && *rows >= 1);
    let Some((columns, rows)) = parsed else {
        bail!("invalid grid format '{raw}': use <columns>x<rows> (e.g., 3x2)");
    };
    if columns > MAX_GRID_SIDE || rows > MAX_GRID_SIDE {
        bail!("grid too large: maximum {MAX_GRID_SIDE}x{MAX_GRID_SIDE}");
    }
    Ok(Grid { columns, rows })
}
