//! Per-call request descriptors.

use std::time::Duration;

use serde::Serialize;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::HttpMethod;

/// Everything needed to run one call.
///
/// `body` always holds the serialized request value; whether it is sent
/// depends on `method` and is decided by the executor.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub client: Client,
    pub path: String,
    pub query: String,
    pub method: HttpMethod,
    pub body: Vec<u8>,
    pub expected_status_codes: Vec<u16>,
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Serialize `request` as JSON and bind it to `client`.
    pub fn new<R>(
        client: &Client,
        path: &str,
        query: &str,
        method: HttpMethod,
        expected_status_codes: &[u16],
        request: &R,
    ) -> Result<Self>
    where
        R: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(request).map_err(Error::Serialization)?;
        Ok(Self {
            client: client.clone(),
            path: path.to_string(),
            query: query.to_string(),
            method,
            body,
            expected_status_codes: expected_status_codes.to_vec(),
            timeout: client.call_timeout(),
        })
    }

    /// Bound this call by `timeout`, replacing the client's default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Base URL, path and query concatenated as-is.
    pub fn url(&self) -> String {
        format!("{}{}{}", self.client.base_url(), self.path, self.query)
    }
}
