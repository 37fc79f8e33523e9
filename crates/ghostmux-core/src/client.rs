use crate::bootstrap::{AppLauncher, Bootstrapper, DisabledLauncher, Launcher};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{send_with_retry, RetryPolicy, Transport, UdsTransport};
use crate::uds_ipc::{Method, RequestEnvelope, ResponseEnvelope};
use crate::{CreateTerminalRequest, KeyStroke, Metadata, MetadataMerge, Session, StatusBarUpdate};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Typed operations against the terminal host API.
pub struct GhosttyClient {
    socket_path: PathBuf,
    transport: Box<dyn Transport>,
    send_retry: RetryPolicy,
}

impl GhosttyClient {
    pub fn new(config: ClientConfig) -> Self {
        let launcher: Box<dyn Launcher> = if config.auto_launch {
            Box::new(AppLauncher::new(config.app_id.clone()))
        } else {
            Box::new(DisabledLauncher)
        };
        let bootstrapper =
            Bootstrapper::new(config.socket_path.clone(), config.connect_retry, launcher);
        Self {
            socket_path: config.socket_path,
            transport: Box::new(UdsTransport::new(bootstrapper)),
            send_retry: config.send_retry,
        }
    }

    pub fn with_transport(
        socket_path: impl Into<PathBuf>,
        transport: Box<dyn Transport>,
        send_retry: RetryPolicy,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            transport,
            send_retry,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends one envelope and decodes the reply without interpreting its status.
    pub fn request(&self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope, ClientError> {
        debug!(event = "api_request", method = %envelope.method, path = %envelope.path);
        let payload = envelope.encode()?;
        let bytes = send_with_retry(self.transport.as_ref(), self.send_retry, &payload)?;
        let response = ResponseEnvelope::decode(&bytes)?;
        debug!(event = "api_response", path = %envelope.path, status = response.status);
        Ok(response)
    }

    pub fn list_terminals(&self) -> Result<Vec<Session>, ClientError> {
        let response = self.call(RequestEnvelope::get("/terminals"))?;
        let sessions = response
            .field("terminals")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(Session::from_value).collect())
            .unwrap_or_default();
        Ok(sessions)
    }

    pub fn get_terminal(&self, id: &str) -> Result<Session, ClientError> {
        let response = self.call(RequestEnvelope::get(terminal_path(id)))?;
        body_session(&response).ok_or_else(|| ClientError::message("terminal not found"))
    }

    pub fn create_terminal(&self, request: &CreateTerminalRequest) -> Result<Session, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|err| ClientError::message(format!("invalid create terminal request: {err}")))?;
        let response = self.call(RequestEnvelope::post("/terminals").with_body(body))?;
        body_session(&response)
            .ok_or_else(|| ClientError::message("invalid create terminal response"))
    }

    pub fn delete_terminal(&self, id: &str, confirm: bool) -> Result<(), ClientError> {
        let mut envelope = RequestEnvelope::new(Method::Delete, terminal_path(id));
        if confirm {
            envelope = envelope.with_query_param("confirm", "true");
        }
        self.call_checked(envelope, "kill-surface failed")
    }

    /// True when the peer answers a listing with 200; any failure reads as
    /// unavailable.
    pub fn is_available(&self) -> bool {
        match self.request(&RequestEnvelope::get("/terminals")) {
            Ok(response) => response.is_ok(),
            Err(err) => {
                debug!(event = "api_unavailable", error = %err);
                false
            }
        }
    }

    pub fn send_key(&self, id: &str, stroke: &KeyStroke) -> Result<(), ClientError> {
        let body = serde_json::to_value(stroke)
            .map_err(|err| ClientError::message(format!("invalid key stroke: {err}")))?;
        self.call_checked(
            RequestEnvelope::post(format!("{}/key", terminal_path(id))).with_body(body),
            "send-keys failed",
        )
    }

    pub fn send_text(&self, id: &str, text: &str, enter: bool) -> Result<(), ClientError> {
        let mut body = json!({ "text": text });
        if enter {
            body["enter"] = Value::Bool(true);
        }
        self.call_checked(
            RequestEnvelope::post(format!("{}/input", terminal_path(id))).with_body(body),
            "input failed",
        )
    }

    pub fn send_output(&self, id: &str, data: &str) -> Result<(), ClientError> {
        self.call_checked(
            RequestEnvelope::post(format!("{}/output", terminal_path(id)))
                .with_body(json!({ "data": data })),
            "output failed",
        )
    }

    pub fn set_title(&self, id: &str, title: &str) -> Result<(), ClientError> {
        self.call_checked(
            RequestEnvelope::post(format!("{}/title", terminal_path(id)))
                .with_body(json!({ "title": title })),
            "set-title failed",
        )
    }

    pub fn set_status_bar(&self, id: &str, update: &StatusBarUpdate) -> Result<(), ClientError> {
        if update.is_empty() {
            return Err(ClientError::message(
                "statusbar update requires at least one field",
            ));
        }
        let body = serde_json::to_value(update)
            .map_err(|err| ClientError::message(format!("invalid statusbar update: {err}")))?;
        self.call_checked(
            RequestEnvelope::post(format!("{}/statusbar", terminal_path(id))).with_body(body),
            "statusbar update failed",
        )
    }

    pub fn get_metadata(
        &self,
        id: &str,
        scope: Option<&str>,
        resolved: Option<bool>,
    ) -> Result<Metadata, ClientError> {
        let mut envelope = RequestEnvelope::get(metadata_path(id));
        if let Some(scope) = scope {
            envelope = envelope.with_query_param("scope", scope);
        }
        if let Some(resolved) = resolved {
            envelope = envelope.with_query_param("resolved", resolved.to_string());
        }
        let response = self.call(envelope)?;
        Ok(metadata_data(&response))
    }

    pub fn merge_metadata(
        &self,
        id: &str,
        data: Metadata,
        scope: Option<&str>,
        merge: MetadataMerge,
    ) -> Result<Metadata, ClientError> {
        let method = match merge {
            MetadataMerge::Patch => Method::Patch,
            MetadataMerge::Post => Method::Post,
        };
        self.write_metadata(method, id, data, scope)
    }

    pub fn replace_metadata(
        &self,
        id: &str,
        data: Metadata,
        scope: Option<&str>,
    ) -> Result<Metadata, ClientError> {
        self.write_metadata(Method::Put, id, data, scope)
    }

    pub fn delete_metadata(&self, id: &str, scope: Option<&str>) -> Result<Metadata, ClientError> {
        let mut envelope = RequestEnvelope::new(Method::Delete, metadata_path(id));
        if let Some(scope) = scope {
            envelope = envelope.with_query_param("scope", scope);
        }
        let response = self.call(envelope)?;
        Ok(metadata_data(&response))
    }

    pub fn get_screen_contents(&self, id: &str) -> Result<String, ClientError> {
        let response = self.call(RequestEnvelope::get(format!("{}/screen", terminal_path(id))))?;
        Ok(response.str_field("contents").unwrap_or_default().to_string())
    }

    pub fn get_visible_contents(&self, id: &str) -> Result<String, ClientError> {
        let response = self.call(RequestEnvelope::get(format!(
            "{}/details/visible",
            terminal_path(id)
        )))?;
        Ok(response.str_field("value").unwrap_or_default().to_string())
    }

    pub fn get_selection_contents(&self, id: &str) -> Result<Option<String>, ClientError> {
        let response = self.call(RequestEnvelope::get(format!(
            "{}/details/selection",
            terminal_path(id)
        )))?;
        Ok(response.str_field("value").map(str::to_string))
    }

    pub fn execute_action(&self, id: &str, action: &str) -> Result<(), ClientError> {
        let response = self.call(
            RequestEnvelope::post(format!("{}/action", terminal_path(id)))
                .with_body(json!({ "action": action })),
        )?;
        if response.success() == Some(false) {
            let reason = response.str_field("error").unwrap_or("action failed");
            return Err(ClientError::message(reason));
        }
        Ok(())
    }

    pub fn focus_terminal(&self, id: &str) -> Result<(), ClientError> {
        self.call(RequestEnvelope::post(format!("{}/focus", terminal_path(id))))?;
        Ok(())
    }

    fn write_metadata(
        &self,
        method: Method,
        id: &str,
        data: Metadata,
        scope: Option<&str>,
    ) -> Result<Metadata, ClientError> {
        let mut body = json!({ "data": Value::Object(data) });
        if let Some(scope) = scope {
            body["scope"] = Value::String(scope.to_string());
        }
        let response = self.call(RequestEnvelope::new(method, metadata_path(id)).with_body(body))?;
        Ok(metadata_data(&response))
    }

    /// Exchange plus the 200 check every typed operation needs.
    fn call(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, ClientError> {
        let response = self.request(&envelope)?;
        if !response.is_ok() {
            return Err(ClientError::Api {
                status: response.status,
                message: response.body_error(),
            });
        }
        Ok(response)
    }

    fn call_checked(&self, envelope: RequestEnvelope, failure: &str) -> Result<(), ClientError> {
        let response = self.call(envelope)?;
        if response.success() == Some(false) {
            return Err(ClientError::message(failure));
        }
        Ok(())
    }
}

fn terminal_path(id: &str) -> String {
    format!("/terminals/{id}")
}

fn metadata_path(id: &str) -> String {
    format!("{}/metadata", terminal_path(id))
}

fn body_session(response: &ResponseEnvelope) -> Option<Session> {
    let body = response.body.clone()?;
    Session::from_value(&Value::Object(body))
}

fn metadata_data(response: &ResponseEnvelope) -> Metadata {
    response
        .field("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uds_ipc::TransportError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;
    use std::time::Duration;

    struct Recorded {
        requests: Vec<Value>,
        replies: VecDeque<Result<Value, fn() -> ClientError>>,
    }

    struct RecordingTransport {
        state: Rc<RefCell<Recorded>>,
    }

    impl Transport for RecordingTransport {
        fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, ClientError> {
            let mut state = self.state.borrow_mut();
            let request: Value = serde_json::from_slice(payload).expect("request json");
            state.requests.push(request);
            match state.replies.pop_front() {
                Some(Ok(reply)) => Ok(serde_json::to_vec(&reply).expect("reply json")),
                Some(Err(make)) => Err(make()),
                None => Ok(br#"{"status":200,"body":{}}"#.to_vec()),
            }
        }
    }

    fn client_with(replies: Vec<Value>) -> (GhosttyClient, Rc<RefCell<Recorded>>) {
        let state = Rc::new(RefCell::new(Recorded {
            requests: Vec::new(),
            replies: replies.into_iter().map(Ok).collect(),
        }));
        let client = GhosttyClient::with_transport(
            "/tmp/test.sock",
            Box::new(RecordingTransport {
                state: state.clone(),
            }),
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_millis(1),
            },
        );
        (client, state)
    }

    fn last_request(state: &Rc<RefCell<Recorded>>) -> Value {
        state
            .borrow()
            .requests
            .last()
            .cloned()
            .expect("a request was sent")
    }

    #[test]
    fn list_terminals_skips_malformed_entries() {
        let (client, state) = client_with(vec![json!({
            "status": 200,
            "body": {"terminals": [
                {"id": "11112222-aaaa", "title": "zsh", "focused": true},
                {"title": "no id"},
                {"id": "33334444", "title": "vim", "columns": 80, "rows": 24}
            ]}
        })]);
        let sessions = client.list_terminals().expect("list");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].name(), "rich-moon");
        assert!(sessions[0].focused);
        assert_eq!(sessions[1].columns, Some(80));
        assert_eq!(
            last_request(&state),
            json!({"version": "v2", "method": "GET", "path": "/terminals"})
        );
    }

    #[test]
    fn list_terminals_without_list_is_empty() {
        let (client, _) = client_with(vec![json!({"status": 200})]);
        assert!(client.list_terminals().expect("list").is_empty());
    }

    #[test]
    fn non_200_surfaces_peer_message() {
        let (client, _) = client_with(vec![json!({
            "status": 404,
            "body": {"error": "no such terminal"}
        })]);
        let err = client.get_terminal("abc").expect_err("404");
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        assert_eq!(err.to_string(), "no such terminal");

        let (client, _) = client_with(vec![json!({"body": {}})]);
        let err = client.list_terminals().expect_err("missing status");
        assert_eq!(err.to_string(), "API error (HTTP 500)");
    }

    #[test]
    fn unparsable_terminal_bodies() {
        let (client, _) = client_with(vec![json!({"status": 200, "body": {"id": "x"}})]);
        assert_eq!(
            client.get_terminal("x").expect_err("no title").to_string(),
            "terminal not found"
        );

        let (client, _) = client_with(vec![json!({"status": 200})]);
        assert_eq!(
            client
                .create_terminal(&CreateTerminalRequest::default())
                .expect_err("no body")
                .to_string(),
            "invalid create terminal response"
        );
    }

    #[test]
    fn create_terminal_sends_only_set_fields() {
        let (client, state) = client_with(vec![json!({
            "status": 200,
            "body": {"id": "new-id", "title": "zsh"}
        })]);
        let request = CreateTerminalRequest {
            location: Some(crate::Location::Tab),
            working_directory: Some("/tmp".to_string()),
            ..CreateTerminalRequest::default()
        };
        let session = client.create_terminal(&request).expect("create");
        assert_eq!(session.id, "new-id");
        assert_eq!(
            last_request(&state),
            json!({
                "version": "v2",
                "method": "POST",
                "path": "/terminals",
                "body": {"location": "tab", "working_directory": "/tmp"}
            })
        );
    }

    #[test]
    fn delete_terminal_confirm_and_failure() {
        let (client, state) = client_with(vec![
            json!({"status": 200, "body": {"success": true}}),
            json!({"status": 200, "body": {"success": false}}),
        ]);
        client.delete_terminal("abc", true).expect("delete");
        assert_eq!(last_request(&state)["query"], json!({"confirm": "true"}));
        assert_eq!(last_request(&state)["method"], "DELETE");

        let err = client.delete_terminal("abc", false).expect_err("refused");
        assert_eq!(err.to_string(), "kill-surface failed");
        assert!(last_request(&state).get("query").is_none());
    }

    #[test]
    fn success_false_maps_to_operation_text() {
        let cases: [(&str, fn(&GhosttyClient) -> Result<(), ClientError>); 4] = [
            ("send-keys failed", |c| c.send_key("a", &KeyStroke::enter())),
            ("input failed", |c| c.send_text("a", "ls", false)),
            ("output failed", |c| c.send_output("a", "x")),
            ("set-title failed", |c| c.set_title("a", "t")),
        ];
        for (expected, op) in cases {
            let (client, _) = client_with(vec![json!({"status": 200, "body": {"success": false}})]);
            assert_eq!(op(&client).expect_err(expected).to_string(), expected);
        }
    }

    #[test]
    fn send_text_sets_enter_only_when_requested() {
        let (client, state) = client_with(Vec::new());
        client.send_text("abc", "ls", false).expect("text");
        assert_eq!(last_request(&state)["body"], json!({"text": "ls"}));
        assert_eq!(last_request(&state)["path"], "/terminals/abc/input");

        client.send_text("abc", "ls", true).expect("text");
        assert_eq!(last_request(&state)["body"], json!({"text": "ls", "enter": true}));
    }

    #[test]
    fn empty_status_bar_update_never_reaches_peer() {
        let (client, state) = client_with(Vec::new());
        let err = client
            .set_status_bar("abc", &StatusBarUpdate::default())
            .expect_err("empty");
        assert_eq!(err.to_string(), "statusbar update requires at least one field");
        assert!(state.borrow().requests.is_empty());

        let update = StatusBarUpdate {
            visible: Some(false),
            ..StatusBarUpdate::default()
        };
        client.set_status_bar("abc", &update).expect("hide");
        assert_eq!(last_request(&state)["body"], json!({"visible": false}));
    }

    #[test]
    fn metadata_operations_use_expected_verbs() {
        let data_reply = json!({"status": 200, "body": {"data": {"k": 1}}});
        let (client, state) = client_with(vec![
            data_reply.clone(),
            data_reply.clone(),
            data_reply.clone(),
            data_reply.clone(),
            json!({"status": 200, "body": {"data": "not an object"}}),
        ]);

        let data = client
            .get_metadata("abc", Some("window"), Some(true))
            .expect("get");
        assert_eq!(data.get("k"), Some(&json!(1)));
        let request = last_request(&state);
        assert_eq!(request["path"], "/terminals/abc/metadata");
        assert_eq!(request["query"], json!({"scope": "window", "resolved": "true"}));

        let mut payload = Metadata::new();
        payload.insert("k".to_string(), json!(1));
        client
            .merge_metadata("abc", payload.clone(), None, MetadataMerge::Post)
            .expect("merge");
        assert_eq!(last_request(&state)["method"], "POST");
        assert_eq!(last_request(&state)["body"], json!({"data": {"k": 1}}));

        client
            .replace_metadata("abc", payload.clone(), Some("window"))
            .expect("replace");
        assert_eq!(last_request(&state)["method"], "PUT");
        assert_eq!(
            last_request(&state)["body"],
            json!({"data": {"k": 1}, "scope": "window"})
        );

        client
            .merge_metadata("abc", payload, None, MetadataMerge::Patch)
            .expect("patch");
        assert_eq!(last_request(&state)["method"], "PATCH");

        let data = client.delete_metadata("abc", None).expect("delete");
        assert!(data.is_empty());
        assert_eq!(last_request(&state)["method"], "DELETE");
        assert!(last_request(&state).get("query").is_none());
    }

    #[test]
    fn contents_default_when_missing() {
        let (client, state) = client_with(vec![
            json!({"status": 200, "body": {"contents": "line1\nline2"}}),
            json!({"status": 200, "body": {}}),
            json!({"status": 200, "body": {"value": "sel"}}),
            json!({"status": 200}),
        ]);
        assert_eq!(client.get_screen_contents("a").expect("screen"), "line1\nline2");
        assert_eq!(last_request(&state)["path"], "/terminals/a/screen");
        assert_eq!(client.get_visible_contents("a").expect("visible"), "");
        assert_eq!(last_request(&state)["path"], "/terminals/a/details/visible");
        assert_eq!(
            client.get_selection_contents("a").expect("selection").as_deref(),
            Some("sel")
        );
        assert_eq!(client.get_selection_contents("a").expect("selection"), None);
    }

    #[test]
    fn action_failure_prefers_peer_error() {
        let (client, state) = client_with(vec![
            json!({"status": 200, "body": {"success": false, "error": "no split"}}),
            json!({"status": 200, "body": {"success": false}}),
            json!({"status": 200, "body": {"success": true}}),
        ]);
        let err = client.execute_action("a", "equalize_splits").expect_err("fail");
        assert_eq!(err.to_string(), "no split");
        assert_eq!(last_request(&state)["body"], json!({"action": "equalize_splits"}));
        let err = client.execute_action("a", "equalize_splits").expect_err("fail");
        assert_eq!(err.to_string(), "action failed");
        client.execute_action("a", "equalize_splits").expect("ok");
    }

    #[test]
    fn focus_sends_bodyless_post() {
        let (client, state) = client_with(Vec::new());
        client.focus_terminal("a").expect("focus");
        assert_eq!(
            last_request(&state),
            json!({"version": "v2", "method": "POST", "path": "/terminals/a/focus"})
        );
    }

    #[test]
    fn availability_reflects_status_and_errors() {
        let (client, _) = client_with(vec![json!({"status": 200})]);
        assert!(client.is_available());
        let (client, _) = client_with(vec![json!({"status": 503})]);
        assert!(!client.is_available());

        let (client, state) = client_with(Vec::new());
        let protocol: fn() -> ClientError =
            || TransportError::Protocol("invalid response length".to_string()).into();
        state.borrow_mut().replies.push_back(Err(protocol));
        assert!(!client.is_available());
    }

    #[test]
    fn transient_failures_are_retried_through_the_client() {
        let (client, state) = client_with(Vec::new());
        {
            let mut state = state.borrow_mut();
            let reset: fn() -> ClientError = || {
                TransportError::from_io(
                    "short response header",
                    io::Error::from(io::ErrorKind::UnexpectedEof),
                )
                .into()
            };
            state.replies.push_back(Err(reset));
            state.replies.push_back(Ok(json!({"status": 200, "body": {"terminals": []}})));
        }
        assert!(client.list_terminals().expect("list").is_empty());
        assert_eq!(state.borrow().requests.len(), 2);
    }
}
