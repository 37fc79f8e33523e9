use ghostmux_core::config::{ClientConfig, DEFAULT_APP_ID};
use ghostmux_core::transport::RetryPolicy;
use ghostmux_core::uds_ipc::{read_frame, write_frame, RequestEnvelope, FRAME_HEADER_BYTES};
use ghostmux_core::{ClientError, GhosttyClient};
use serde_json::{json, Value};
use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

enum Reply {
    Json(Value),
    HangUpMidFrame,
    ZeroLength,
}

fn client_for(path: &Path) -> GhosttyClient {
    let config = ClientConfig {
        socket_path: path.to_path_buf(),
        app_id: DEFAULT_APP_ID.to_string(),
        auto_launch: false,
        connect_retry: RetryPolicy {
            attempts: 40,
            delay: Duration::from_millis(25),
        },
        send_retry: RetryPolicy {
            attempts: 10,
            delay: Duration::from_millis(5),
        },
    };
    GhosttyClient::new(config)
}

/// Serves one scripted reply per accepted connection and returns the decoded
/// requests it saw.
fn spawn_peer(listener: UnixListener, replies: Vec<Reply>) -> JoinHandle<Vec<RequestEnvelope>> {
    thread::spawn(move || {
        let mut seen = Vec::new();
        for reply in replies {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_frame(&mut stream).expect("request frame");
            seen.push(serde_json::from_slice(&request).expect("request envelope"));
            respond(&mut stream, reply);
        }
        seen
    })
}

fn respond(stream: &mut UnixStream, reply: Reply) {
    match reply {
        Reply::Json(value) => {
            let payload = serde_json::to_vec(&value).expect("reply json");
            write_frame(stream, &payload).expect("reply frame");
        }
        Reply::HangUpMidFrame => {
            stream.write_all(&[0, 0]).expect("partial header");
        }
        Reply::ZeroLength => {
            stream
                .write_all(&[0u8; FRAME_HEADER_BYTES])
                .expect("zero header");
        }
    }
}

fn socket_in(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("api.sock")
}

fn one_terminal() -> Value {
    json!({
        "status": 200,
        "body": {"terminals": [{
            "id": "11112222-3333-4444-5555-666677778888",
            "title": "zsh",
            "working_directory": "/tmp",
            "focused": true
        }]}
    })
}

#[test]
fn lists_terminals_from_fake_peer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = socket_in(&dir);
    let listener = UnixListener::bind(&path).expect("bind");
    let peer = spawn_peer(listener, vec![Reply::Json(one_terminal())]);

    let client = client_for(&path);
    let sessions = client.list_terminals().expect("list");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "11112222-3333-4444-5555-666677778888");
    assert_eq!(sessions[0].name(), "rich-moon");
    assert_eq!(sessions[0].short_id(), "11112222");

    let seen = peer.join().expect("peer");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], RequestEnvelope::get("/terminals"));
}

#[test]
fn retries_after_peer_hangs_up_mid_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = socket_in(&dir);
    let listener = UnixListener::bind(&path).expect("bind");
    let peer = spawn_peer(
        listener,
        vec![
            Reply::HangUpMidFrame,
            Reply::HangUpMidFrame,
            Reply::Json(one_terminal()),
        ],
    );

    let client = client_for(&path);
    let sessions = client.list_terminals().expect("list after retries");
    assert_eq!(sessions.len(), 1);
    assert_eq!(peer.join().expect("peer").len(), 3);
}

#[test]
fn zero_length_response_is_a_protocol_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = socket_in(&dir);
    let listener = UnixListener::bind(&path).expect("bind");
    let peer = spawn_peer(listener, vec![Reply::ZeroLength]);

    let client = client_for(&path);
    let err = client.list_terminals().expect_err("zero length");
    assert!(!err.is_transient());
    assert_eq!(err.to_string(), "invalid response length");
    assert_eq!(peer.join().expect("peer").len(), 1);
}

#[test]
fn waits_for_a_late_binding_peer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = socket_in(&dir);
    let bind_path = path.clone();
    let peer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        let listener = UnixListener::bind(&bind_path).expect("bind");
        spawn_peer(listener, vec![Reply::Json(json!({"status": 200}))])
            .join()
            .expect("inner peer")
    });

    let client = client_for(&path);
    assert!(client.is_available());
    assert_eq!(peer.join().expect("peer").len(), 1);
}

#[test]
fn api_errors_carry_the_peer_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = socket_in(&dir);
    let listener = UnixListener::bind(&path).expect("bind");
    let peer = spawn_peer(
        listener,
        vec![Reply::Json(json!({
            "status": 404,
            "body": {"message": "terminal not found", "error": "ignored"}
        }))],
    );

    let client = client_for(&path);
    let err = client.set_title("abc", "build").expect_err("404");
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "terminal not found");

    let seen = peer.join().expect("peer");
    assert_eq!(seen[0].path, "/terminals/abc/title");
    assert_eq!(seen[0].body, Some(json!({"title": "build"})));
}

#[test]
fn missing_socket_reports_connect_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = socket_in(&dir);
    let config = ClientConfig {
        socket_path: path.clone(),
        auto_launch: false,
        connect_retry: RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(1),
        },
        ..ClientConfig::default()
    };
    let client = GhosttyClient::new(config);
    let err = client.list_terminals().expect_err("nothing listening");
    assert_eq!(
        err.to_string(),
        format!("cannot connect to Ghostty UDS at {}", path.display())
    );
    assert!(!client.is_available());
}
