//! Settings port: the desired endpoint set and its change notifications.

use crate::hub::domain::{EndpointDeclaration, EndpointId, HubDomainError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Result type for settings store operations.
pub type EndpointSettingsResult<T> = Result<T, EndpointSettingsError>;

/// Readable, subscribable source of endpoint declarations.
#[async_trait]
pub trait EndpointSettingsSource: Send + Sync {
    /// Returns the current declarations in configuration order.
    async fn load(&self) -> EndpointSettingsResult<Vec<EndpointDeclaration>>;

    /// Subscribes to replacement notifications.
    ///
    /// A notification means only that the desired state may have changed;
    /// it carries no delta.
    fn subscribe(&self) -> SettingsChanges;
}

/// Stream of "settings replaced" notifications.
///
/// Backed by a [`watch`] channel carrying a revision counter, so bursts of
/// notifications received while the consumer is busy collapse into one.
#[derive(Debug, Clone)]
pub struct SettingsChanges {
    receiver: watch::Receiver<u64>,
}

impl SettingsChanges {
    /// Wraps a revision receiver.
    #[must_use]
    pub const fn new(receiver: watch::Receiver<u64>) -> Self {
        Self { receiver }
    }

    /// Waits for the next notification.
    ///
    /// Returns `false` once the store has gone away and no further
    /// notifications can arrive.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Returns the latest revision seen by the store.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.receiver.borrow()
    }
}

/// Errors returned by settings store implementations.
#[derive(Debug, Clone, Error)]
pub enum EndpointSettingsError {
    /// No declaration exists with the given identity.
    #[error("endpoint {0} not found")]
    NotFound(EndpointId),

    /// A declaration with the same identity already exists.
    #[error("duplicate endpoint identity: {0}")]
    DuplicateEndpoint(EndpointId),

    /// Stored or imported settings failed domain validation.
    #[error(transparent)]
    Domain(#[from] HubDomainError),

    /// Stored settings could not be decoded.
    #[error("invalid endpoint settings: {0}")]
    InvalidDocument(Arc<dyn std::error::Error + Send + Sync>),

    /// The backing storage failed.
    #[error("settings storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl EndpointSettingsError {
    /// Wraps a decoding failure.
    pub fn invalid_document(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidDocument(Arc::new(err))
    }

    /// Wraps a storage-layer failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
