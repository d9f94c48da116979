//! Shared client core for REST and WebSocket SDKs.
//!
//! # Overview
//! Sends authenticated HTTP calls to a REST API and reads WebSocket streams.
//! SDKs supply a base URL, optional credentials and a header injector that
//! signs each request; the core builds the request, runs it through a
//! transport, and turns the response into either a decoded value or one
//! structured error.
//!
//! # Design
//! - Everything is blocking and runs on the caller's thread. `Client` is
//!   immutable and shareable; concurrency means many callers, never
//!   background work inside the core.
//! - The network sits behind `Transport`, so the request/classify pipeline
//!   is testable without sockets. `UreqTransport` is the default.
//! - Status handling is explicit per call: an expected status set, with
//!   anything else becoming an `ApiError` whose message comes from the
//!   body's `message` field or the raw body text.
//! - No retries, rate limiting or backoff anywhere. Failures go straight
//!   back to the caller.

pub mod client;
pub mod error;
pub mod executor;
pub mod http;
pub mod query;
pub mod request;
pub mod transport;
pub mod types;
pub mod utils;
pub mod ws;

pub use client::{Client, ClientBuilder, STATUS_OK};
pub use error::{ApiError, ApiErrorKind, Error, Result};
pub use executor::{classify, execute, HeaderInjector, NoopHeaderInjector, ResponseEnvelope};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{append_query_param, EMPTY_QUERY_PARAMS};
pub use request::RequestDescriptor;
pub use transport::{Transport, TransportConfig, TransportError, UreqTransport};
pub use types::Credentials;
pub use utils::{slice_diff, str_to_num};
pub use ws::{
    dial, dial_with_stream, listen_for_messages, listen_for_text_messages, DialerConfig,
    MessageType, ProxyMode, ShutdownHandle, WebSocketConnection,
};
