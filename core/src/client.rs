//! Authenticated REST client and its call entry points.
//!
//! # Design
//! `Client` is immutable configuration: base URL, optional credentials, the
//! transport, the header injector and an optional per-call timeout. It is
//! cheap to clone and safe to share; every call builds its own
//! `RequestDescriptor` and `ResponseEnvelope`, so concurrent calls never see
//! each other's state.
//!
//! Two layers of entry points exist. `get`/`post`/`put`/`patch`/`delete`
//! require credentials and accept only `200 OK`. `call` and `call_raw` take
//! the method and expected status set explicitly and skip the credentials
//! guard; their `_with_timeout` forms bound a single call with its own
//! deadline.
//!
//! The base URL is kept exactly as given. Call URLs are base URL, path and
//! query joined with nothing added or removed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::executor::{execute, HeaderInjector, NoopHeaderInjector, ResponseEnvelope};
use crate::http::HttpMethod;
use crate::request::RequestDescriptor;
use crate::transport::{Transport, TransportConfig, UreqTransport};
use crate::types::Credentials;

pub const STATUS_OK: u16 = 200;

/// Blocking client for a REST API.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    credentials: Option<Credentials>,
    transport: Arc<dyn Transport>,
    header_injector: Arc<dyn HeaderInjector>,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder(base_url: &str) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    pub fn get<R, T>(&self, path: &str, query: &str, request: &R) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.authenticated_call(HttpMethod::Get, path, query, request)
    }

    pub fn post<R, T>(&self, path: &str, query: &str, request: &R) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.authenticated_call(HttpMethod::Post, path, query, request)
    }

    pub fn put<R, T>(&self, path: &str, query: &str, request: &R) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.authenticated_call(HttpMethod::Put, path, query, request)
    }

    pub fn patch<R, T>(&self, path: &str, query: &str, request: &R) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.authenticated_call(HttpMethod::Patch, path, query, request)
    }

    pub fn delete<R, T>(&self, path: &str, query: &str, request: &R) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.authenticated_call(HttpMethod::Delete, path, query, request)
    }

    /// Run a call with an explicit method and expected status set, decoding
    /// the response body on success.
    pub fn call<R, T>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &str,
        expected_status_codes: &[u16],
        request: &R,
    ) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_raw(method, path, query, expected_status_codes, request)?
            .decode()
    }

    /// Like `call`, but bounded by `timeout` instead of the client's
    /// `call_timeout`.
    pub fn call_with_timeout<R, T>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &str,
        expected_status_codes: &[u16],
        request: &R,
        timeout: Duration,
    ) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_raw_with_timeout(method, path, query, expected_status_codes, request, timeout)?
            .decode()
    }

    /// Run a call and return the envelope without decoding it.
    ///
    /// Only request encoding fails here; HTTP failures are reported in
    /// `ResponseEnvelope::error`.
    pub fn call_raw<R>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &str,
        expected_status_codes: &[u16],
        request: &R,
    ) -> Result<ResponseEnvelope>
    where
        R: Serialize + ?Sized,
    {
        let descriptor =
            RequestDescriptor::new(self, path, query, method, expected_status_codes, request)?;
        Ok(execute(descriptor, self.header_injector.as_ref()))
    }

    /// Like `call_raw`, but bounded by `timeout` instead of the client's
    /// `call_timeout`.
    pub fn call_raw_with_timeout<R>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &str,
        expected_status_codes: &[u16],
        request: &R,
        timeout: Duration,
    ) -> Result<ResponseEnvelope>
    where
        R: Serialize + ?Sized,
    {
        let descriptor =
            RequestDescriptor::new(self, path, query, method, expected_status_codes, request)?
                .with_timeout(timeout);
        Ok(execute(descriptor, self.header_injector.as_ref()))
    }

    fn authenticated_call<R, T>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &str,
        request: &R,
    ) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.credentials.is_none() {
            return Err(Error::CredentialsNotSet);
        }
        self.call(method, path, query, &[STATUS_OK], request)
    }
}

/// Builder for `Client`.
pub struct ClientBuilder {
    base_url: String,
    credentials: Option<Credentials>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    header_injector: Arc<dyn HeaderInjector>,
    call_timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            credentials: None,
            transport: None,
            transport_config: TransportConfig::default(),
            header_injector: Arc::new(NoopHeaderInjector),
            call_timeout: None,
        }
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use a custom transport. Overrides `transport_config`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Tune the default ureq transport.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    pub fn header_injector(mut self, injector: impl HeaderInjector + 'static) -> Self {
        self.header_injector = Arc::new(injector);
        self
    }

    /// Bound every call made through the client, end to end.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Client {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::new(&self.transport_config)),
        };
        Client {
            base_url: self.base_url,
            credentials: self.credentials,
            transport,
            header_injector: self.header_injector,
            call_timeout: self.call_timeout,
        }
    }
}
