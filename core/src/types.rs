//! Caller-held credential bundle.
//!
//! # Design
//! The core never looks inside `Credentials`; it only checks that a client
//! has some before the credentialed entry points run. The header injector is
//! what reads them. Secrets are wrapped so they never show up in `Debug`
//! output or tracing fields.

use secrecy::{ExposeSecret, SecretString};

/// API credentials for a single portfolio.
///
/// The secrets are only readable through `passphrase` and `signing_key`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    passphrase: SecretString,
    signing_key: SecretString,
    pub portfolio_id: String,
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        passphrase: impl Into<String>,
        signing_key: impl Into<String>,
        portfolio_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            passphrase: SecretString::from(passphrase.into()),
            signing_key: SecretString::from(signing_key.into()),
            portfolio_id: portfolio_id.into(),
        }
    }

    pub fn passphrase(&self) -> &str {
        self.passphrase.expose_secret()
    }

    pub fn signing_key(&self) -> &str {
        self.signing_key.expose_secret()
    }
}
