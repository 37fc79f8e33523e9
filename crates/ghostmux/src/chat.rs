use crate::output::{list_line, print_json, SessionRecord};
use crate::App;
use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use ghostmux_core::config::{current_surface, SURFACE_ENV};
use ghostmux_core::{friendly_name, resolve_with_names, KeyStroke};
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Gap between typing a message and pressing Enter, so the input lands
/// before the submit.
const ENTER_DELAY: Duration = Duration::from_millis(200);
const PREFIX: &str = "ghostchat";

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum ChatCommand {
    /// Show your chat identity and the message protocol
    Info,
    /// List terminals with their friendly names
    #[command(alias = "ls")]
    List(ChatListArgs),
    /// Send a one-line message to another terminal
    Send(ChatSendArgs),
}

#[derive(Args, Debug)]
pub struct ChatListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ChatSendArgs {
    /// Friendly name, UUID, UUID prefix or title
    pub target: String,
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub message: Vec<String>,
}

#[derive(Serialize)]
struct ChatEntry<'a> {
    #[serde(flatten)]
    session: SessionRecord<'a>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_me: bool,
}

pub fn handle_chat_command(app: &App, command: ChatCommand) -> Result<()> {
    match command {
        ChatCommand::Info => {
            println!("{}", info_text(current_surface().as_deref()));
            Ok(())
        }
        ChatCommand::List(args) => list(app, &args),
        ChatCommand::Send(args) => send(app, &args),
    }
}

fn list(app: &App, args: &ChatListArgs) -> Result<()> {
    let sessions = app.client().list_terminals()?;
    let me = current_surface();
    if args.json {
        let entries: Vec<ChatEntry> = sessions
            .iter()
            .map(|session| ChatEntry {
                session: SessionRecord::from(session),
                is_me: me.as_deref() == Some(session.id.as_str()),
            })
            .collect();
        return print_json(&serde_json::json!({ "terminals": entries }));
    }
    if sessions.is_empty() {
        println!("(no terminals found)");
        return Ok(());
    }
    for session in &sessions {
        println!("{}", list_line(session, me.as_deref()));
    }
    Ok(())
}

fn send(app: &App, args: &ChatSendArgs) -> Result<()> {
    let me = current_surface()
        .ok_or_else(|| anyhow!("${SURFACE_ENV} not set - are you in a Ghostty terminal?"))?;
    let message = single_line(&args.message);
    if message.is_empty() {
        bail!("send requires a message");
    }

    let sessions = app.client().list_terminals()?;
    let Some(target) = resolve_with_names(&args.target, &sessions) else {
        bail!("cannot find terminal: {}", args.target);
    };
    if target.id == me {
        bail!("cannot send to yourself");
    }

    let framed = frame_message(&friendly_name(&me), &message);
    app.client().send_text(&target.id, &framed, false)?;
    thread::sleep(ENTER_DELAY);
    app.client().send_key(&target.id, &KeyStroke::enter())?;

    info!(event = "chat_sent", target = %target.id, bytes = framed.len());
    println!("Sent to {}", target.name());
    Ok(())
}

fn single_line(parts: &[String]) -> String {
    parts
        .join(" ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

fn frame_message(sender: &str, message: &str) -> String {
    format!("[{PREFIX}:{sender}] {message}")
}

fn info_text(me: Option<&str>) -> String {
    let (name, uuid) = match me {
        Some(uuid) => (friendly_name(uuid), uuid.to_string()),
        None => (
            "(unknown)".to_string(),
            "(not in a Ghostty terminal)".to_string(),
        ),
    };
    format!(
        "ghostmux chat - messaging between agents in Ghostty terminals

YOUR IDENTITY
  Name: {name}
  UUID: {uuid}

PROTOCOL
  Messages arrive as: [{PREFIX}:<sender-name>] <message>
  The sender name in the brackets identifies who wrote it.

COMMANDS
  ghostmux chat info                   Show this text
  ghostmux chat list                   List terminals with their names
  ghostmux chat send <target> <msg>    Send a message

  <target> is a friendly name (swift-falcon), a UUID or UUID prefix,
  or part of a terminal title.

Messages are single-line; newlines are replaced with spaces."
    )
}
