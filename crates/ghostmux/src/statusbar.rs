use crate::App;
use anyhow::Result;
use clap::{Args, Subcommand};
use ghostmux_core::config::SURFACE_ENV;
use ghostmux_core::StatusBarUpdate;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum StatusBarCommand {
    /// Set segment text as "left|center|right"
    Set(StatusBarSetArgs),
    Show(StatusBarTargetArgs),
    Hide(StatusBarTargetArgs),
    Toggle(StatusBarTargetArgs),
}

#[derive(Args, Debug)]
pub struct StatusBarTargetArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    /// Apply to the whole window instead of this surface
    #[arg(long)]
    pub window: bool,
}

#[derive(Args, Debug)]
pub struct StatusBarSetArgs {
    #[command(flatten)]
    pub scope: StatusBarTargetArgs,
    /// Segments separated by '|'; an empty segment clears it
    pub segments: Option<String>,
    #[arg(long)]
    pub left: Option<String>,
    #[arg(long)]
    pub center: Option<String>,
    #[arg(long)]
    pub right: Option<String>,
    #[arg(long)]
    pub fg: Option<String>,
    #[arg(long)]
    pub bg: Option<String>,
}

pub fn handle_statusbar_command(app: &App, command: StatusBarCommand) -> Result<()> {
    let (scope, update) = match command {
        StatusBarCommand::Set(args) => {
            let update = set_update(&args);
            (args.scope, update)
        }
        StatusBarCommand::Show(scope) => (
            scope,
            StatusBarUpdate {
                visible: Some(true),
                ..StatusBarUpdate::default()
            },
        ),
        StatusBarCommand::Hide(scope) => (
            scope,
            StatusBarUpdate {
                visible: Some(false),
                ..StatusBarUpdate::default()
            },
        ),
        StatusBarCommand::Toggle(scope) => (
            scope,
            StatusBarUpdate {
                toggle: Some(true),
                ..StatusBarUpdate::default()
            },
        ),
    };
    let update = with_scope(update, scope.window);
    let session = app.resolve_required(scope.target.as_deref(), "statusbar")?;
    app.client().set_status_bar(&session.id, &update)?;
    Ok(())
}

/// Positional segments fill left, center and right in order; explicit
/// `--left/--center/--right` flags override them.
fn set_update(args: &StatusBarSetArgs) -> StatusBarUpdate {
    let mut update = StatusBarUpdate::default();
    if let Some(segments) = &args.segments {
        let mut parts = segments.splitn(3, '|').map(str::to_string);
        update.left = parts.next();
        update.center = parts.next();
        update.right = parts.next();
    }
    if args.left.is_some() {
        update.left = args.left.clone();
    }
    if args.center.is_some() {
        update.center = args.center.clone();
    }
    if args.right.is_some() {
        update.right = args.right.clone();
    }
    update.fg = args.fg.clone();
    update.bg = args.bg.clone();
    update
}

/// Scope alone is not a change, so it is only attached to a real update.
fn with_scope(mut update: StatusBarUpdate, window: bool) -> StatusBarUpdate {
    if window && !update.is_empty() {
        update.scope = Some("window".to_string());
    }
    update
}
