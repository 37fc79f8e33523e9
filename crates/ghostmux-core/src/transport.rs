use crate::bootstrap::Bootstrapper;
use crate::error::ClientError;
use crate::uds_ipc::{read_frame, write_frame};
use std::thread;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Waiting for the peer socket to start listening.
    pub const CONNECT: Self = Self {
        attempts: 20,
        delay: Duration::from_millis(100),
    };
    /// Repeating a whole exchange after a transient failure.
    pub const SEND: Self = Self {
        attempts: 10,
        delay: Duration::from_millis(100),
    };
}

/// One request/response exchange over a fresh connection.
pub trait Transport {
    fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, ClientError>;
}

/// Repeats the entire exchange on transient failures. A retried request may
/// reach the peer twice if the first response was lost after it acted.
pub fn send_with_retry(
    transport: &dyn Transport,
    policy: RetryPolicy,
    payload: &[u8],
) -> Result<Vec<u8>, ClientError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match transport.exchange(payload) {
            Ok(response) => return Ok(response),
            Err(err) if err.is_transient() && attempt < attempts => {
                debug!(
                    event = "uds_exchange_retry",
                    attempt,
                    max_attempts = attempts,
                    error = %err
                );
                thread::sleep(policy.delay);
            }
            Err(err) => {
                if err.is_transient() {
                    debug!(event = "uds_exchange_exhausted", attempts, error = %err);
                }
                return Err(err);
            }
        }
    }
}

pub struct UdsTransport {
    bootstrapper: Bootstrapper,
}

impl UdsTransport {
    pub fn new(bootstrapper: Bootstrapper) -> Self {
        Self { bootstrapper }
    }
}

impl Transport for UdsTransport {
    fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, ClientError> {
        // The stream is dropped, and the socket closed, on every return path.
        let mut stream = self.bootstrapper.ensure_connectable()?;
        write_frame(&mut stream, payload)?;
        let response = read_frame(&mut stream)?;
        Ok(response)
    }
}
