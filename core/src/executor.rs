//! Call execution and response classification.
//!
//! # Design
//! `execute` runs one call start to finish on the caller's thread: resolve
//! the URL, pick the body, build the wire request, let the header injector
//! sign it, hand it to the transport, then classify the status. Every
//! failure lands in `ResponseEnvelope::error`; nothing is retried and
//! nothing is returned early as a panic or a second error channel.
//!
//! `classify` is kept free of I/O so the status/error-body rules can be
//! exercised without a transport.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::client::Client;
use crate::error::{ApiError, ApiErrorKind, Error};
use crate::http::HttpRequest;
use crate::request::RequestDescriptor;
use crate::transport::TransportError;

/// Signs or otherwise decorates an outgoing request in place.
///
/// Called exactly once per call, after the wire request is built and before
/// it is sent. `path` is the resolved URL path (no scheme, host or query),
/// `body` is exactly what will be sent, and `timestamp` is taken just
/// before the call. Whatever headers the injector sets are sent unchecked.
pub trait HeaderInjector: Send + Sync {
    fn inject(
        &self,
        request: &mut HttpRequest,
        path: &str,
        body: &[u8],
        client: &Client,
        timestamp: DateTime<Utc>,
    );
}

impl<F> HeaderInjector for F
where
    F: Fn(&mut HttpRequest, &str, &[u8], &Client, DateTime<Utc>) + Send + Sync,
{
    fn inject(
        &self,
        request: &mut HttpRequest,
        path: &str,
        body: &[u8],
        client: &Client,
        timestamp: DateTime<Utc>,
    ) {
        self(request, path, body, client, timestamp)
    }
}

/// Leaves requests untouched. The default for clients built without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHeaderInjector;

impl HeaderInjector for NoopHeaderInjector {
    fn inject(&self, _: &mut HttpRequest, _: &str, _: &[u8], _: &Client, _: DateTime<Utc>) {}
}

/// Outcome of one call.
///
/// When `error` is set the body must not be decoded as a success payload;
/// `decode` enforces that.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub request: RequestDescriptor,
    pub body: Vec<u8>,
    /// 0 when the call failed before a response arrived.
    pub http_status_code: u16,
    pub http_status_msg: String,
    pub error: Option<ApiError>,
}

impl ResponseEnvelope {
    fn new(request: RequestDescriptor) -> Self {
        Self {
            request,
            body: Vec::new(),
            http_status_code: 0,
            http_status_msg: String::new(),
            error: None,
        }
    }

    fn failed(mut self, error: ApiError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The envelope itself on success, or its error.
    pub fn into_result(self) -> Result<Self, ApiError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Decode the body into the caller's response type.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, Error> {
        let envelope = self.into_result()?;
        serde_json::from_slice(&envelope.body).map_err(Error::Deserialization)
    }
}

/// Run one call described by `request`, signing it with `injector`.
pub fn execute(request: RequestDescriptor, injector: &dyn HeaderInjector) -> ResponseEnvelope {
    let call_url = request.url();
    let expected = request.expected_status_codes.clone();
    let envelope = ResponseEnvelope::new(request);

    let parsed = match Url::parse(&call_url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(url = %call_url, error = %e, "rejected invalid URL");
            return envelope.failed(ApiError::before_response(
                ApiErrorKind::InvalidUrl,
                format!("invalid URL: {call_url} - {e}"),
                &call_url,
                &expected,
            ));
        }
    };

    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return envelope.failed(ApiError::before_response(
            ApiErrorKind::Request,
            format!("unsupported request URL: {call_url}"),
            &call_url,
            &expected,
        ));
    }

    let method = envelope.request.method;
    let body = if method.carries_body() {
        envelope.request.body.clone()
    } else {
        Vec::new()
    };

    // Send the normalized URL so the path handed to the injector is the
    // path that goes on the wire.
    let mut wire = HttpRequest::new(method, parsed.as_str(), body.clone());
    injector.inject(
        &mut wire,
        parsed.path(),
        &body,
        &envelope.request.client,
        Utc::now(),
    );

    debug!(%method, url = %call_url, body_len = body.len(), "sending request");
    let transport = envelope.request.client.transport();
    let response = match transport.execute(&wire, envelope.request.timeout) {
        Ok(response) => response,
        Err(e) => {
            let kind = match e {
                TransportError::Send(_) => ApiErrorKind::Transport,
                TransportError::BodyRead(_) => ApiErrorKind::BodyRead,
            };
            debug!(%method, url = %call_url, error = %e, "request failed before a status was received");
            return envelope.failed(ApiError::before_response(
                kind,
                e.to_string(),
                &call_url,
                &expected,
            ));
        }
    };

    let mut envelope = envelope;
    envelope.error = classify(response.status, &expected, &response.body, &call_url);
    envelope.http_status_code = response.status;
    envelope.http_status_msg = response.status_text;
    envelope.body = response.body;

    match &envelope.error {
        None => trace!(%method, url = %call_url, status = envelope.http_status_code, "request succeeded"),
        Some(err) => debug!(
            %method,
            url = %call_url,
            status = envelope.http_status_code,
            message = %err.message,
            "unexpected status"
        ),
    }
    envelope
}

/// Decide whether `status` is a success for this call.
///
/// Returns `None` when `status` is in `expected`. Otherwise the message is
/// read from the body by `ApiError::message_from_body`, and the expected
/// set, received status and URL are filled in from the call.
pub fn classify(status: u16, expected: &[u16], body: &[u8], url: &str) -> Option<ApiError> {
    if expected.contains(&status) {
        return None;
    }

    Some(ApiError {
        kind: ApiErrorKind::UnexpectedStatus,
        message: ApiError::message_from_body(body),
        code_expected: expected.to_vec(),
        code_received: status,
        parsed_url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde::Deserialize;

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::stub::StubTransport;

    fn client_with(base_url: &str, transport: Arc<StubTransport>) -> Client {
        Client::builder(base_url).transport(transport).build()
    }

    fn descriptor(client: &Client, method: HttpMethod, expected: &[u16]) -> RequestDescriptor {
        RequestDescriptor::new(
            client,
            "/v1/orders",
            "?limit=5",
            method,
            expected,
            &serde_json::json!({"side": "BUY"}),
        )
        .unwrap()
    }

    #[test]
    fn classify_accepts_member_of_expected_set() {
        assert!(classify(201, &[200, 201], b"{}", "http://x").is_none());
        assert!(classify(201, &[201, 200], b"{}", "http://x").is_none());
    }

    #[test]
    fn classify_reads_message_from_json_body() {
        let err = classify(400, &[201, 200], br#"{"message":"bad request"}"#, "http://x/y").unwrap();
        assert_eq!(err.message, "bad request");
        assert_eq!(err.code_received, 400);
        assert_eq!(err.code_expected, vec![201, 200]);
        assert_eq!(err.parsed_url, "http://x/y");
        assert_eq!(err.kind, ApiErrorKind::UnexpectedStatus);
    }

    #[test]
    fn classify_falls_back_to_raw_text() {
        let err = classify(500, &[200], b"oops", "http://x").unwrap();
        assert_eq!(err.message, "oops");
    }

    #[test]
    fn classify_json_without_message_has_empty_message() {
        for body in [r#"{"error":"nope"}"#, "null", r#"{"message":null}"#] {
            let err = classify(400, &[200], body.as_bytes(), "http://x").unwrap();
            assert_eq!(err.message, "");
            assert_eq!(err.code_received, 400);
        }
    }

    #[test]
    fn classify_is_lossy_on_invalid_utf8() {
        let err = classify(502, &[200], &[0x6f, 0xff, 0x6b], "http://x").unwrap();
        assert_eq!(err.message, "o\u{fffd}k");
    }

    #[test]
    fn classify_with_empty_expected_set_always_fails() {
        assert!(classify(200, &[], b"", "http://x").is_some());
    }

    #[test]
    fn invalid_url_never_reaches_transport() {
        let transport = StubTransport::responding(200, "{}");
        let client = client_with("not a url", transport.clone());
        let envelope = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector);

        let err = envelope.error.unwrap();
        assert_eq!(err.kind, ApiErrorKind::InvalidUrl);
        assert_eq!(err.code_received, 0);
        assert_eq!(err.parsed_url, "not a url/v1/orders?limit=5");
        assert!(err.message.starts_with("invalid URL: not a url/v1/orders?limit=5 - "));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn non_http_scheme_is_a_request_error() {
        let transport = StubTransport::responding(200, "{}");
        let client = client_with("mailto:desk@example.com", transport.clone());
        let envelope = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector);

        let err = envelope.error.unwrap();
        assert_eq!(err.kind, ApiErrorKind::Request);
        assert_eq!(err.code_received, 0);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn get_sends_no_body_but_post_does() {
        let transport = StubTransport::responding(200, "{}");
        let client = client_with("http://localhost:9", transport.clone());

        execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector);
        execute(descriptor(&client, HttpMethod::Delete, &[200]), &NoopHeaderInjector);
        execute(descriptor(&client, HttpMethod::Post, &[200]), &NoopHeaderInjector);
        execute(descriptor(&client, HttpMethod::Patch, &[200]), &NoopHeaderInjector);

        let sent = transport.requests();
        assert!(sent[0].body.is_empty());
        assert!(sent[1].body.is_empty());
        assert_eq!(sent[2].body, br#"{"side":"BUY"}"#);
        assert_eq!(sent[3].body, br#"{"side":"BUY"}"#);
        assert_eq!(sent[0].url, "http://localhost:9/v1/orders?limit=5");
    }

    #[test]
    fn injector_sees_path_body_and_client() {
        let transport = StubTransport::responding(200, "{}");
        let client = client_with("http://localhost:9/api", transport.clone());
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let injector = move |req: &mut HttpRequest,
                             path: &str,
                             body: &[u8],
                             client: &Client,
                             _ts: DateTime<Utc>| {
            req.set_header("X-Signature", format!("{}:{}", path, body.len()));
            *captured.lock().unwrap() = Some((path.to_string(), client.base_url().to_string()));
        };

        execute(descriptor(&client, HttpMethod::Put, &[200]), &injector);

        let (path, base) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(path, "/api/v1/orders");
        assert_eq!(base, "http://localhost:9/api");
        let sent = transport.requests();
        assert_eq!(sent[0].header("x-signature"), Some("/api/v1/orders:14"));
    }

    #[test]
    fn signed_path_matches_sent_url() {
        let transport = StubTransport::responding(200, "{}");
        let client = client_with("http://localhost:9", transport.clone());
        let request =
            RequestDescriptor::new(&client, "/v1/./orders", "", HttpMethod::Get, &[200], &()).unwrap();
        let injector = |req: &mut HttpRequest,
                        path: &str,
                        _: &[u8],
                        _: &Client,
                        _: DateTime<Utc>| {
            req.set_header("X-Signed-Path", path);
        };

        let envelope = execute(request, &injector);

        let sent = transport.requests();
        assert_eq!(sent[0].header("x-signed-path"), Some("/v1/orders"));
        assert_eq!(sent[0].url, "http://localhost:9/v1/orders");
        assert_eq!(envelope.request.url(), "http://localhost:9/v1/./orders");
    }

    #[test]
    fn transport_failure_has_zero_status() {
        let transport = StubTransport::failing(TransportError::Send("connection refused".into()));
        let client = client_with("http://localhost:9", transport);
        let envelope = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector);

        assert_eq!(envelope.http_status_code, 0);
        let err = envelope.error.unwrap();
        assert_eq!(err.kind, ApiErrorKind::Transport);
        assert_eq!(err.message, "connection refused");
        assert_eq!(err.code_received, 0);
    }

    #[test]
    fn body_read_failure_has_zero_status() {
        let transport = StubTransport::failing(TransportError::BodyRead("reset".into()));
        let client = client_with("http://localhost:9", transport);
        let err = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector)
            .error
            .unwrap();
        assert_eq!(err.kind, ApiErrorKind::BodyRead);
        assert_eq!(err.code_received, 0);
    }

    #[test]
    fn unexpected_status_populates_envelope_and_error() {
        let transport = StubTransport::responding(404, r#"{"message":"no such order"}"#);
        let client = client_with("http://localhost:9", transport);
        let envelope = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector);

        assert_eq!(envelope.http_status_code, 404);
        assert_eq!(envelope.body, br#"{"message":"no such order"}"#);
        let err = envelope.error.unwrap();
        assert_eq!(err.message, "no such order");
        assert_eq!(err.parsed_url, "http://localhost:9/v1/orders?limit=5");
    }

    #[test]
    fn decode_on_success_and_refusal_on_error() {
        #[derive(Deserialize)]
        struct Order {
            id: String,
        }

        let transport = StubTransport::responding(200, r#"{"id":"o-1"}"#);
        let client = client_with("http://localhost:9", transport);
        let order: Order = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector)
            .decode()
            .unwrap();
        assert_eq!(order.id, "o-1");

        let transport = StubTransport::responding(500, r#"{"id":"o-1"}"#);
        let client = client_with("http://localhost:9", transport);
        let err = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector)
            .decode::<Order>()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Api(_)));
    }

    #[test]
    fn decode_failure_is_a_deserialization_error() {
        let transport = StubTransport::responding(200, "not json");
        let client = client_with("http://localhost:9", transport);
        let err = execute(descriptor(&client, HttpMethod::Get, &[200]), &NoopHeaderInjector)
            .decode::<serde_json::Value>()
            .unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }
}
