use crate::error::ClientError;
use crate::transport::RetryPolicy;
use std::io;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, info};

/// Starts the peer application when nothing is listening yet.
pub trait Launcher {
    fn is_running(&self) -> bool;
    fn launch(&self) -> Result<(), ClientError>;
}

/// Launches the peer by bundle identifier through `open -g -b`.
#[derive(Debug, Clone)]
pub struct AppLauncher {
    app_id: String,
}

impl AppLauncher {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }

    fn launch_error(&self, reason: String) -> ClientError {
        ClientError::Launch {
            app_id: self.app_id.clone(),
            reason,
        }
    }
}

impl Launcher for AppLauncher {
    fn is_running(&self) -> bool {
        let script = format!("application id \"{}\" is running", self.app_id);
        match Command::new("osascript")
            .args(["-e", &script])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            Ok(output) => {
                debug!(event = "peer_running_check_failed", status = %output.status);
                false
            }
            Err(err) => {
                debug!(event = "peer_running_check_failed", error = %err);
                false
            }
        }
    }

    fn launch(&self) -> Result<(), ClientError> {
        let status = Command::new("open")
            .args(["-g", "-b", &self.app_id])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| self.launch_error(format!("failed to spawn open: {err}")))?;
        if !status.success() {
            return Err(self.launch_error(format!("open exited with status {status}")));
        }
        Ok(())
    }
}

/// Used when auto-launch is off: the peer is assumed to be managed elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLauncher;

impl Launcher for DisabledLauncher {
    fn is_running(&self) -> bool {
        true
    }

    fn launch(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Hands out connected sockets, launching the peer at most once per instance.
pub struct Bootstrapper {
    socket_path: PathBuf,
    policy: RetryPolicy,
    launcher: Box<dyn Launcher>,
    attempted: AtomicBool,
}

impl Bootstrapper {
    pub fn new(socket_path: impl Into<PathBuf>, policy: RetryPolicy, launcher: Box<dyn Launcher>) -> Self {
        Self {
            socket_path: socket_path.into(),
            policy,
            launcher,
            attempted: AtomicBool::new(false),
        }
    }

    pub fn launch_attempted(&self) -> bool {
        self.attempted.load(Ordering::SeqCst)
    }

    pub fn ensure_connectable(&self) -> Result<UnixStream, ClientError> {
        self.ensure_peer()?;

        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => return Ok(stream),
                Err(err) if is_not_listening(&err) && attempt < attempts => {
                    debug!(
                        event = "uds_connect_retry",
                        socket = %self.socket_path.display(),
                        attempt,
                        max_attempts = attempts,
                        error = %err
                    );
                    thread::sleep(self.policy.delay);
                }
                Err(err) => {
                    debug!(
                        event = "uds_connect_failed",
                        socket = %self.socket_path.display(),
                        attempt,
                        error = %err
                    );
                    return Err(ClientError::Connect {
                        path: self.socket_path.clone(),
                        source: err,
                    });
                }
            }
        }
    }

    fn ensure_peer(&self) -> Result<(), ClientError> {
        // Flag flips before launching so a failed launch is never repeated.
        if self.attempted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.launcher.is_running() {
            return Ok(());
        }
        info!(event = "peer_launch", socket = %self.socket_path.display());
        self.launcher.launch()
    }
}

fn is_not_listening(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    )
}
