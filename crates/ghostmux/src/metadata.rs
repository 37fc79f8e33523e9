use crate::output::print_json;
use crate::App;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use ghostmux_core::config::SURFACE_ENV;
use ghostmux_core::{Metadata, MetadataMerge};
use serde_json::{json, Value};

const WINDOW_SCOPE: &str = "window";

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum MetadataCommand {
    Get(MetadataGetArgs),
    Set(MetadataSetArgs),
    Delete(MetadataDeleteArgs),
}

#[derive(Args, Debug)]
pub struct MetadataTarget {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    /// Use window-level metadata instead of surface-level
    #[arg(long)]
    pub window: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MetadataGetArgs {
    #[command(flatten)]
    pub target: MetadataTarget,
    /// Window metadata overlaid by surface metadata
    #[arg(long)]
    pub resolved: bool,
}

#[derive(Args, Debug)]
pub struct MetadataSetArgs {
    #[command(flatten)]
    pub target: MetadataTarget,
    /// JSON object to merge (or store, with --replace)
    pub data: String,
    /// Replace (PUT) instead of merge (PATCH)
    #[arg(long, conflicts_with = "post")]
    pub replace: bool,
    /// Merge with POST instead of PATCH
    #[arg(long)]
    pub post: bool,
}

#[derive(Args, Debug)]
pub struct MetadataDeleteArgs {
    #[command(flatten)]
    pub target: MetadataTarget,
}

pub fn handle_metadata_command(app: &App, command: MetadataCommand) -> Result<()> {
    match command {
        MetadataCommand::Get(args) => {
            let session = resolve(app, &args.target)?;
            let data = app.client().get_metadata(
                &session,
                scope(&args.target),
                args.resolved.then_some(true),
            )?;
            // Reads always print; --json only changes the layout.
            print_data(data, true, args.target.json)
        }
        MetadataCommand::Set(args) => {
            let payload = parse_object(&args.data)?;
            let session = resolve(app, &args.target)?;
            let data = if args.replace {
                app.client()
                    .replace_metadata(&session, payload, scope(&args.target))?
            } else {
                let merge = if args.post {
                    MetadataMerge::Post
                } else {
                    MetadataMerge::Patch
                };
                app.client()
                    .merge_metadata(&session, payload, scope(&args.target), merge)?
            };
            print_data(data, false, args.target.json)
        }
        MetadataCommand::Delete(args) => {
            let session = resolve(app, &args.target)?;
            let data = app
                .client()
                .delete_metadata(&session, scope(&args.target))?;
            print_data(data, false, args.target.json)
        }
    }
}

fn resolve(app: &App, target: &MetadataTarget) -> Result<String> {
    Ok(app
        .resolve_required(target.target.as_deref(), "metadata")?
        .id)
}

fn scope(target: &MetadataTarget) -> Option<&'static str> {
    target.window.then_some(WINDOW_SCOPE)
}

fn print_data(data: Metadata, always: bool, json: bool) -> Result<()> {
    if !always && !json {
        return Ok(());
    }
    let payload = json!({ "data": Value::Object(data) });
    if json {
        println!("{}", serde_json::to_string(&payload)?);
        return Ok(());
    }
    print_json(&payload)
}

fn parse_object(raw: &str) -> Result<Metadata> {
    let value: Value =
        serde_json::from_str(raw).context("metadata must be valid JSON")?;
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(anyhow!("metadata JSON must be an object")),
    }
}
