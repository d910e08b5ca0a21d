//! Operation descriptors and the merged tool catalog.

use super::{EndpointId, EndpointName, HubDomainError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation advertised by one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    name: String,
    description: Option<String>,
    input_schema: Value,
}

impl OperationDescriptor {
    /// Creates an operation descriptor.
    ///
    /// The input schema is kept verbatim; the hub never inspects it.
    ///
    /// # Errors
    ///
    /// Returns [`HubDomainError::EmptyOperationName`] when the name is empty
    /// after trimming.
    pub fn new(name: impl Into<String>, input_schema: Value) -> Result<Self, HubDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(HubDomainError::EmptyOperationName);
        }

        Ok(Self {
            name: normalized_name,
            description: None,
            input_schema,
        })
    }

    /// Sets a human description. Blank descriptions are dropped.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let normalized = description.into().trim().to_owned();
        self.description = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}

/// Catalog entry: one operation tagged with the endpoint that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    endpoint_id: EndpointId,
    endpoint_name: EndpointName,
    operation: OperationDescriptor,
}

impl CatalogEntry {
    /// Tags an operation with its owning endpoint.
    #[must_use]
    pub const fn new(
        endpoint_id: EndpointId,
        endpoint_name: EndpointName,
        operation: OperationDescriptor,
    ) -> Self {
        Self {
            endpoint_id,
            endpoint_name,
            operation,
        }
    }

    /// Returns the owning endpoint identity.
    #[must_use]
    pub const fn endpoint_id(&self) -> &EndpointId {
        &self.endpoint_id
    }

    /// Returns the owning endpoint display name.
    #[must_use]
    pub const fn endpoint_name(&self) -> &EndpointName {
        &self.endpoint_name
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.operation.name()
    }

    /// Returns the optional operation description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.operation.description()
    }

    /// Returns the operation input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        self.operation.input_schema()
    }
}

/// Ordered catalog of every operation offered by the live connections.
///
/// A catalog is immutable once built. Refreshing produces a new catalog
/// that replaces the previous one as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
}

impl ToolCatalog {
    /// Creates a catalog from ordered entries.
    #[must_use]
    pub const fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Creates an empty catalog.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns all entries in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the catalog holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries owned by endpoints with the given name.
    pub fn for_endpoint<'a>(
        &'a self,
        endpoint_name: &'a str,
    ) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.endpoint_name().as_str() == endpoint_name)
    }

    /// Finds an operation by endpoint name and operation name.
    #[must_use]
    pub fn find(&self, endpoint_name: &str, operation: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| {
            entry.endpoint_name().as_str() == endpoint_name && entry.name() == operation
        })
    }
}
