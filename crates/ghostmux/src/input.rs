use crate::App;
use anyhow::{bail, Result};
use clap::Args;
use ghostmux_core::config::SURFACE_ENV;
use ghostmux_core::KeyStroke;

#[derive(Args, Debug)]
pub struct SendKeysArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    /// Text to type; quote it to include spaces, e.g. "ls -la"
    pub text: String,
    /// Type the text without pressing Enter
    #[arg(long)]
    pub no_enter: bool,
}

#[derive(Args, Debug)]
pub struct SendKeyArgs {
    #[arg(short = 't', long = "target", env = SURFACE_ENV)]
    pub target: Option<String>,
    /// Key in tmux notation: `C-c`, `M-x`, `S-Tab`, `Enter`, `Up`, `F5`, `a`
    #[arg(allow_hyphen_values = true)]
    pub key: String,
}

pub fn send_keys(app: &App, args: &SendKeysArgs) -> Result<()> {
    let session = app.resolve_required(args.target.as_deref(), "send-keys")?;
    app.client()
        .send_text(&session.id, &args.text, !args.no_enter)?;
    Ok(())
}

pub fn send_key(app: &App, args: &SendKeyArgs) -> Result<()> {
    let stroke = parse_key(&args.key)?;
    let session = app.resolve_required(args.target.as_deref(), "send-key")?;
    app.client().send_key(&session.id, &stroke)?;
    Ok(())
}

/// Named keys: (aliases, API key name, text produced, unshifted codepoint).
const NAMED_KEYS: &[(&[&str], &str, Option<&str>, u32)] = &[
    (&["enter", "return", "cr"], "enter", Some("\n"), 0x0A),
    (&["tab"], "tab", Some("\t"), 0x09),
    (&["escape", "esc"], "escape", None, 0x1B),
    (&["space"], "space", Some(" "), 0x20),
    (&["bspace", "backspace", "bs"], "backspace", None, 0x7F),
    (&["delete", "dc", "del"], "delete", None, 0),
    (&["insert", "ic"], "insert", None, 0),
    (&["up"], "arrow_up", None, 0),
    (&["down"], "arrow_down", None, 0),
    (&["left"], "arrow_left", None, 0),
    (&["right"], "arrow_right", None, 0),
    (&["home"], "home", None, 0),
    (&["end"], "end", None, 0),
    (&["pageup", "ppage", "pgup"], "page_up", None, 0),
    (&["pagedown", "npage", "pgdn"], "page_down", None, 0),
];

/// Parses tmux-style key notation into a key stroke. Modifier prefixes
/// (`C-`, `M-`/`A-`, `S-`) may be stacked; the remainder is a named key,
/// a function key or a single character.
pub fn parse_key(spec: &str) -> Result<KeyStroke> {
    let mut mods: Vec<String> = Vec::new();
    let mut rest = spec;
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        let modifier = match rest.as_bytes()[0].to_ascii_uppercase() {
            b'C' => "ctrl",
            b'M' | b'A' => "alt",
            b'S' => "shift",
            _ => break,
        };
        if !mods.iter().any(|existing| existing == modifier) {
            mods.push(modifier.to_string());
        }
        rest = &rest[2..];
    }
    if rest.is_empty() {
        bail!("empty key: {spec:?}");
    }

    let lower = rest.to_lowercase();
    if let Some((_, name, text, codepoint)) = NAMED_KEYS
        .iter()
        .find(|(aliases, ..)| aliases.contains(&lower.as_str()))
    {
        return Ok(KeyStroke {
            key: name.to_string(),
            text: text.filter(|_| mods.is_empty()).map(str::to_string),
            mods,
            unshifted_codepoint: *codepoint,
        });
    }

    if let Some(number) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&number) {
            return Ok(KeyStroke {
                key: format!("f{number}"),
                mods,
                text: None,
                unshifted_codepoint: 0,
            });
        }
    }

    let mut chars = rest.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        bail!("unknown key: {spec}");
    };
    if ch.is_control() {
        bail!("unknown key: {spec:?}");
    }
    let base = ch.to_lowercase().next().unwrap_or(ch);
    if ch.is_uppercase() && !mods.iter().any(|existing| existing == "shift") {
        mods.push("shift".to_string());
    }
    let plain = mods.iter().all(|existing| existing == "shift");
    Ok(KeyStroke {
        key: base.to_string(),
        text: plain.then(|| ch.to_string()),
        mods,
        unshifted_codepoint: base as u32,
    })
}
