//! Transport ports: establishing connections and talking to endpoints.

use crate::hub::domain::{EndpointAddress, OperationDescriptor, TransportParams};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// One established link to an endpoint.
///
/// Handles are owned exclusively by the hub's live connection map and are
/// closed when their record is removed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Lists the operations the endpoint currently advertises, in the
    /// endpoint's own order.
    async fn list_operations(&self) -> TransportResult<Vec<OperationDescriptor>>;

    /// Invokes an operation and returns the endpoint's opaque result.
    async fn invoke(&self, operation: &str, arguments: Value) -> TransportResult<Value>;

    /// Closes the link.
    ///
    /// Closing must be idempotent: a second close succeeds without effect.
    async fn close(&self) -> TransportResult<()>;
}

/// Factory for connection handles.
#[cfg_attr(test, mockall::automock(type Handle = MockConnectionHandle;))]
#[async_trait]
pub trait EndpointConnector: Send + Sync {
    /// Handle type produced by this connector.
    type Handle: ConnectionHandle + 'static;

    /// Establishes a link to the endpoint at `address`.
    ///
    /// A handle returned here may be closed immediately without leaking
    /// resources.
    async fn connect(
        &self,
        address: &EndpointAddress,
        params: &TransportParams,
    ) -> TransportResult<Self::Handle>;
}

/// Errors returned by transport adapters.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The link could not be established.
    #[error("connection failed: {0}")]
    Connect(Arc<dyn std::error::Error + Send + Sync>),

    /// The endpoint answered with something the transport could not use.
    #[error("protocol error: {0}")]
    Protocol(Arc<dyn std::error::Error + Send + Sync>),

    /// The endpoint reported a failure while running the operation.
    #[error("remote invocation failed: {0}")]
    Invocation(Arc<dyn std::error::Error + Send + Sync>),

    /// The handle was already closed.
    #[error("connection is closed")]
    Closed,
}

impl TransportError {
    /// Wraps a failure to establish a link.
    pub fn connect(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connect(Arc::new(err))
    }

    /// Wraps a protocol-level failure.
    pub fn protocol(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Protocol(Arc::new(err))
    }

    /// Wraps a failure reported by the remote operation.
    pub fn invocation(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Invocation(Arc::new(err))
    }
}
