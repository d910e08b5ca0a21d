//! Identifier and display-name types for endpoints.

use super::HubDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a declared endpoint.
///
/// Identities are assigned by the configuration store and never change for
/// the lifetime of a declaration. Live connections are keyed by identity
/// only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Creates a validated endpoint identity.
    ///
    /// # Errors
    ///
    /// Returns [`HubDomainError::EmptyEndpointId`] when the value is empty
    /// after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HubDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(HubDomainError::EmptyEndpointId);
        }
        Ok(Self(normalized))
    }

    /// Generates a fresh random identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Human-readable endpoint label.
///
/// Names are not guaranteed unique. They tag catalog entries and are how
/// callers address an endpoint, but they never key live connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointName(String);

impl EndpointName {
    /// Creates a validated display name. Surrounding whitespace is trimmed;
    /// case is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`HubDomainError::EmptyEndpointName`] when the value is empty
    /// after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, HubDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(HubDomainError::EmptyEndpointName);
        }
        Ok(Self(normalized))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EndpointName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
