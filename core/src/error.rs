//! Error types for the SDK core.
//!
//! # Design
//! `ApiError` is the structured error every HTTP failure collapses into,
//! whether the call died before a response (bad URL, transport, body read)
//! or came back with a status outside the expected set. Its `kind` says
//! which; `code_received` is 0 for every kind except `UnexpectedStatus`.
//!
//! `Error` is the crate-level error that public entry points return. Local
//! failures that never reach the wire (credentials guard, request encoding)
//! and failures after a successful classification (response decoding) get
//! their own variants so callers can tell them apart from `Api`.

use serde_json::{Map, Value};
use thiserror::Error;

/// Which stage of a call produced an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiErrorKind {
    /// Base URL + path + query did not parse as a URL.
    InvalidUrl,
    /// The URL parsed but could not be turned into a sendable request.
    Request,
    /// Connection, TLS, DNS, timeout or any other send failure.
    Transport,
    /// The response arrived but its body could not be read.
    BodyRead,
    /// The response status was not in the expected set.
    #[default]
    UnexpectedStatus,
}

/// Structured error for a single HTTP call.
///
/// Only `message` is read from the wire (see `message_from_body`).
/// `code_expected`, `code_received` and `parsed_url` always come from the
/// call itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error(
    "Unexpected response: {message}, Expected Status Codes: {code_expected:?}, \
     Received Status Code: {code_received}, URL: {parsed_url}"
)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub code_expected: Vec<u16>,
    pub code_received: u16,
    pub parsed_url: String,
}

impl ApiError {
    /// An error for a call that failed before any status code was obtained.
    pub fn before_response(
        kind: ApiErrorKind,
        message: impl Into<String>,
        parsed_url: impl Into<String>,
        code_expected: &[u16],
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            code_expected: code_expected.to_vec(),
            code_received: 0,
            parsed_url: parsed_url.into(),
        }
    }

    /// The message carried by an error response body.
    ///
    /// A JSON object or `null` is a structured error: its string `message`
    /// field, or empty when the field is absent or null. Any other body,
    /// including a `message` of another type, yields the raw body text.
    pub fn message_from_body(body: &[u8]) -> String {
        let raw = || String::from_utf8_lossy(body).into_owned();
        match serde_json::from_slice::<Option<Map<String, Value>>>(body) {
            Ok(None) => String::new(),
            Ok(Some(fields)) => match fields.get("message") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(message)) => message.clone(),
                Some(_) => raw(),
            },
            Err(_) => raw(),
        }
    }

    pub fn is_unexpected_status(&self) -> bool {
        self.kind == ApiErrorKind::UnexpectedStatus
    }
}

/// Errors returned by the public client and websocket entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// A credentialed entry point was called on a client without credentials.
    #[error("credentials not set")]
    CredentialsNotSet,

    /// The request value could not be encoded as JSON.
    #[error("failed to serialize request: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The HTTP call failed or returned an unexpected status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The response was accepted but its body did not decode into the
    /// caller's response type.
    #[error("failed to deserialize response: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("invalid websocket URL: {0}")]
    InvalidWebSocketUrl(String),

    /// The proxy URL was unusable or the proxy refused the tunnel.
    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

impl Error {
    /// The structured HTTP error, if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
