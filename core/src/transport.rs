//! The transport seam between the executor and the network.
//!
//! # Design
//! The executor only ever sees the `Transport` trait: hand it a finished
//! `HttpRequest`, get back an `HttpResponse` with the body drained, or a
//! `TransportError`. Connection pooling, TLS and proxies live behind the
//! trait. `UreqTransport` is the blocking default; tests and embedding SDKs
//! can supply their own.

use std::io::Read;
use std::time::Duration;

use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Failure to complete an exchange. Either way no status code is usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or no response head arrived.
    #[error("{0}")]
    Send(String),
    /// The response head arrived but reading the body failed.
    #[error("{0}")]
    BodyRead(String),
}

/// Executes one HTTP exchange.
///
/// Implementations must be safe to share across threads: one `Client` is
/// cloned freely and used from many callers at once, and any pool locking is
/// the transport's business.
pub trait Transport: Send + Sync {
    /// Send `request` and read the full response.
    ///
    /// `timeout` bounds the whole exchange when set. Non-2xx statuses are
    /// responses, not errors.
    fn execute(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError>;
}

/// Tuning for the default transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    /// Time allowed between sending the request and receiving the response
    /// head.
    pub response_header_timeout: Duration,
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
    pub idle_connection_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            response_header_timeout: Duration::from_secs(5),
            max_idle_connections: 10,
            max_idle_connections_per_host: 5,
            idle_connection_timeout: Duration::from_secs(90),
        }
    }
}

/// Blocking transport backed by a pooled `ureq::Agent`.
///
/// Proxy settings are taken from the environment (`HTTPS_PROXY` and
/// friends), which is ureq's default.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_recv_response(Some(config.response_header_timeout))
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections_per_host)
            .max_idle_age(config.idle_connection_timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_slice();

        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(url), request, timeout).call(),
            HttpMethod::Delete => prepare(self.agent.delete(url), request, timeout).call(),
            HttpMethod::Post => prepare(self.agent.post(url), request, timeout).send(body),
            HttpMethod::Put => prepare(self.agent.put(url), request, timeout).send(body),
            HttpMethod::Patch => prepare(self.agent.patch(url), request, timeout).send(body),
        };
        let mut response = result.map_err(|e| TransportError::Send(e.to_string()))?;

        let status = response.status();
        let status_text = match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => status.as_u16().to_string(),
        };
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let mut body = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut body)
            .map_err(|e| TransportError::BodyRead(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body,
        })
    }
}

/// Copy the injected headers onto the builder and bound the exchange.
fn prepare<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.config().timeout_global(timeout).build()
}
