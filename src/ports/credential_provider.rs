//! Credential provider port - source of the bearer credential.
//!
//! The core only consumes a current token string; issuing and refreshing it
//! is the host application's business.

use secrecy::{ExposeSecret, SecretString};

/// Opaque bearer credential for both the transport and the HTTP API.
#[derive(Clone)]
pub struct BearerCredential(SecretString);

impl BearerCredential {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into()))
    }

    /// Exposes the raw token for writing into an Authorization header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for BearerCredential {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl Eq for BearerCredential {}

impl std::fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerCredential([REDACTED])")
    }
}

/// Port supplying the current credential.
pub trait CredentialProvider: Send + Sync {
    /// Returns the credential to use for the next connection or request.
    fn current(&self) -> BearerCredential;
}

/// Provider backed by a fixed token, for tests and simple embedders.
pub struct StaticCredentialProvider {
    credential: BearerCredential,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credential: BearerCredential::new(token),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn current(&self) -> BearerCredential {
        self.credential.clone()
    }
}
