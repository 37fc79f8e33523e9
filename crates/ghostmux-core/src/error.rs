use crate::uds_ipc::TransportError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("cannot connect to Ghostty UDS at {}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to launch {app_id}: {reason}")]
    Launch { app_id: String, reason: String },
    #[error("{}", api_error_text(*status, message.as_deref()))]
    Api { status: i64, message: Option<String> },
    #[error("{0}")]
    Message(String),
}

impl ClientError {
    pub fn message(text: impl Into<String>) -> Self {
        ClientError::Message(text.into())
    }

    /// Only transport-level transient failures are worth another exchange.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(err) => err.is_transient(),
            ClientError::Connect { .. }
            | ClientError::Launch { .. }
            | ClientError::Api { .. }
            | ClientError::Message(_) => false,
        }
    }
}

fn api_error_text(status: i64, message: Option<&str>) -> String {
    match message {
        Some(message) => message.to_string(),
        None => format!("API error (HTTP {status})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_uses_peer_message_when_present() {
        let err = ClientError::Api {
            status: 404,
            message: Some("terminal not found".to_string()),
        };
        assert_eq!(err.to_string(), "terminal not found");

        let err = ClientError::Api {
            status: 503,
            message: None,
        };
        assert_eq!(err.to_string(), "API error (HTTP 503)");
    }

    #[test]
    fn only_transient_transport_errors_are_retryable() {
        let reset = ClientError::from(TransportError::from_io(
            "failed to write request",
            io::Error::from(io::ErrorKind::ConnectionReset),
        ));
        assert!(reset.is_transient());

        let protocol = ClientError::from(TransportError::Protocol("invalid response".into()));
        assert!(!protocol.is_transient());

        let refused = ClientError::Connect {
            path: PathBuf::from("/tmp/api.sock"),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(!refused.is_transient());
        assert_eq!(refused.to_string(), "cannot connect to Ghostty UDS at /tmp/api.sock");
    }
}
