use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

pub const PROTOCOL_VERSION: &str = "v2";
pub const FRAME_HEADER_BYTES: usize = 4;
/// Buffer reserved before the body arrives; larger frames grow as they are read.
const INITIAL_BODY_CAPACITY: usize = 64 * 1024;
pub const STATUS_OK: i64 = 200;
pub const STATUS_MISSING: i64 = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical request. `query` and `body` are left off the wire entirely when
/// absent so the peer never has to tell "missing" from "empty".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEnvelope {
    pub version: String,
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub query: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub body: Option<Value>,
}

impl RequestEnvelope {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            method,
            path: path.into(),
            query: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = if query.is_empty() { None } else { Some(query) };
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self)
            .map_err(|err| TransportError::Protocol(format!("request encode failed: {err}")))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseEnvelope {
    pub status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Map<String, Value>>,
}

impl ResponseEnvelope {
    /// Decodes a response payload. A missing `status` is read as 500 so an
    /// incomplete reply can never pass for success; a non-object `body` is
    /// dropped.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|_| TransportError::Protocol("invalid response".to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(TransportError::Protocol("invalid response".to_string()));
        };
        let status = object
            .get("status")
            .and_then(Value::as_i64)
            .unwrap_or(STATUS_MISSING);
        let body = match object.remove("body") {
            Some(Value::Object(body)) => Some(body),
            _ => None,
        };
        Ok(Self { status, body })
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|body| body.get(key))
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// Explicit `success` flag, when the peer sent one.
    pub fn success(&self) -> Option<bool> {
        self.field("success").and_then(Value::as_bool)
    }

    /// Human-readable failure text; `message` wins over `error`.
    pub fn body_error(&self) -> Option<String> {
        self.str_field("message")
            .or_else(|| self.str_field("error"))
            .map(str::to_string)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{context}")]
    Transient {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{context}")]
    Fatal {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Protocol(String),
}

impl TransportError {
    pub fn from_io(context: impl Into<String>, source: io::Error) -> Self {
        let context = context.into();
        if is_transient_io(&source) {
            TransportError::Transient { context, source }
        } else {
            TransportError::Fatal { context, source }
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Transient { .. } => true,
            TransportError::Fatal { .. } | TransportError::Protocol(_) => false,
        }
    }
}

/// Broken pipe, reset and not-connected, plus the short read/write the peer
/// causes by hanging up mid-frame.
pub fn is_transient_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
    )
}

pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let length = u32::try_from(payload.len()).map_err(|_| {
        TransportError::Protocol(format!("request too large: {} bytes", payload.len()))
    })?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_BYTES + payload.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Writes one frame. `write_all` resumes partial writes and retries
/// interrupted calls at the same offset.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError> {
    let frame = encode_frame(payload)?;
    writer
        .write_all(&frame)
        .map_err(|err| TransportError::from_io("failed to write request", err))?;
    writer
        .flush()
        .map_err(|err| TransportError::from_io("failed to write request", err))
}

/// Reads exactly one frame and nothing past it.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; FRAME_HEADER_BYTES];
    reader
        .read_exact(&mut header)
        .map_err(|err| TransportError::from_io("short response header", err))?;

    let length = u32::from_be_bytes(header) as usize;
    if length == 0 {
        return Err(TransportError::Protocol(
            "invalid response length".to_string(),
        ));
    }
    let mut payload = Vec::with_capacity(length.min(INITIAL_BODY_CAPACITY));
    reader
        .by_ref()
        .take(length as u64)
        .read_to_end(&mut payload)
        .map_err(|err| TransportError::from_io("short response body", err))?;
    if payload.len() < length {
        return Err(TransportError::from_io(
            "short response body",
            io::Error::from(io::ErrorKind::UnexpectedEof),
        ));
    }
    Ok(payload)
}
