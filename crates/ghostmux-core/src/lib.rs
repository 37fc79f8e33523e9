pub mod bootstrap;
pub mod client;
pub mod config;
pub mod error;
pub mod naming;
pub mod resolve;
#[cfg(test)]
mod test_log;
pub mod transport;
pub mod uds_ipc;

pub use client::GhosttyClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use naming::{friendly_name, short_id};
pub use resolve::{resolve_target, resolve_with_names};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A terminal surface as reported by the peer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub working_directory: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub focused: bool,
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub columns: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub rows: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub cell_width: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub cell_height: Option<u32>,
}

impl Session {
    /// Builds a session from one entry of a peer payload; entries without a
    /// string `id` and `title` are not sessions.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    pub fn name(&self) -> String {
        friendly_name(&self.id)
    }

    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SplitDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitDirection::Left => "left",
            SplitDirection::Right => "right",
            SplitDirection::Up => "up",
            SplitDirection::Down => "down",
        }
    }
}

impl fmt::Display for SplitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitDirection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "left" => Ok(SplitDirection::Left),
            "right" => Ok(SplitDirection::Right),
            "up" => Ok(SplitDirection::Up),
            "down" => Ok(SplitDirection::Down),
            _ => Err(format!(
                "invalid direction '{input}': must be left, right, up, or down"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Window,
    Tab,
    Split(SplitDirection),
}

impl Location {
    pub fn wire_value(&self) -> String {
        match self {
            Location::Window => "window".to_string(),
            Location::Tab => "tab".to_string(),
            Location::Split(direction) => format!("split:{direction}"),
        }
    }
}

impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.wire_value())
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CreateTerminalRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub unshifted_codepoint: u32,
}

impl KeyStroke {
    pub fn enter() -> Self {
        Self {
            key: "enter".to_string(),
            mods: Vec::new(),
            text: Some("\n".to_string()),
            unshifted_codepoint: 0x0A,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusBarUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
}

impl StatusBarUpdate {
    pub fn is_empty(&self) -> bool {
        *self == StatusBarUpdate::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMerge {
    Patch,
    Post,
}

pub type Metadata = Map<String, Value>;

/// Geometry the peer could not express as a non-negative integer is dropped
/// rather than failing the whole session.
fn deserialize_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<Value>::deserialize(deserializer)?;
    Ok(val
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok()))
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<Value>::deserialize(deserializer)?;
    Ok(val.as_ref().and_then(Value::as_str).map(str::to_string))
}

fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<Value>::deserialize(deserializer)?;
    Ok(val.as_ref().and_then(Value::as_bool).unwrap_or(false))
}
