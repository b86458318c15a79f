//! The identity used to log in to WebAuth

use crate::error::{Error, Result};
use std::fmt;

/// Immutable identifier/secret pair.
///
/// Held only in memory; `Debug` output never includes the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialStore {
    identifier: String,
    secret: String,
}

impl CredentialStore {
    /// Create a credential pair. Both fields must be non-empty.
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        let secret = secret.into();

        if identifier.trim().is_empty() {
            return Err(Error::EmptyCredential { field: "identifier" });
        }
        if secret.is_empty() {
            return Err(Error::EmptyCredential { field: "secret" });
        }

        Ok(Self { identifier, secret })
    }

    /// The login identifier (e.g. a UCInetID)
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The login secret
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
