use crate::transport::RetryPolicy;
use std::path::PathBuf;

pub const DEFAULT_APP_ID: &str = "com.lherron.scriptableghostty";
pub const SOCKET_ENV: &str = "GHOSTTY_API_SOCKET";
pub const SURFACE_ENV: &str = "GHOSTTY_SURFACE_UUID";
pub const APP_ID_ENV: &str = "GHOSTMUX_APP_ID";
pub const AUTO_LAUNCH_ENV: &str = "GHOSTMUX_AUTO_LAUNCH";

const SOCKET_RELATIVE: &str = "Library/Application Support/Ghostty/api.sock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    pub app_id: String,
    pub auto_launch: bool,
    pub connect_retry: RetryPolicy,
    pub send_retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            app_id: DEFAULT_APP_ID.to_string(),
            auto_launch: cfg!(target_os = "macos"),
            connect_retry: RetryPolicy::CONNECT,
            send_retry: RetryPolicy::SEND,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Empty or blank
    /// values count as unset.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(path) = var(SOCKET_ENV) {
            config.socket_path = PathBuf::from(path);
        }
        if let Some(app_id) = var(APP_ID_ENV) {
            config.app_id = app_id.trim().to_string();
        }
        if let Some(flag) = var(AUTO_LAUNCH_ENV).and_then(|value| parse_flag(&value)) {
            config.auto_launch = flag;
        }
        config
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }
}

pub fn default_socket_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/"))
        .join(SOCKET_RELATIVE)
}

/// The terminal this process runs inside, when launched by the peer.
pub fn current_surface() -> Option<String> {
    std::env::var(SURFACE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
