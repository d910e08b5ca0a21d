//! Error types for hub domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing hub domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubDomainError {
    /// The endpoint identity is empty after trimming.
    #[error("endpoint identity must not be empty")]
    EmptyEndpointId,

    /// The endpoint display name is empty after trimming.
    #[error("endpoint name must not be empty")]
    EmptyEndpointName,

    /// The endpoint address is empty after trimming.
    #[error("endpoint address must not be empty")]
    EmptyAddress,

    /// The endpoint address does not have an `http://` or `https://` prefix.
    #[error("endpoint address '{0}' must start with 'http://' or 'https://'")]
    InvalidAddress(String),

    /// An operation name is empty after trimming.
    #[error("operation name must not be empty")]
    EmptyOperationName,
}

/// Error returned while parsing a transport kind from configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown endpoint transport kind: {0}")]
pub struct ParseTransportKindError(pub String);
