//! Connector Framework traits
//!
//! Capability-based trait definitions for directory connectors.

use async_trait::async_trait;

use crate::error::{ConnectorError, ConnectorResult};
use crate::operation::{
    AttributeDelta, AttributeSet, Filter, SearchRequest, SearchResult, SearchScope, Uid,
};

/// Base trait for all connectors.
///
/// This trait provides common functionality that all connectors must implement,
/// regardless of their specific capabilities.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the directory.
    ///
    /// Returns `Ok(())` if the connection and bind succeed, or an error
    /// describing what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Dispose of connector resources.
    ///
    /// Closes the cached session. Further operations fail with
    /// [`ConnectorError::Disposed`].
    async fn dispose(&self) -> ConnectorResult<()>;

    /// Check if the connector is currently healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Capability for creating entries.
#[async_trait]
pub trait CreateOp: Connector {
    /// Add a new entry at `dn` with the given attributes.
    ///
    /// Fails with [`ConnectorError::ObjectAlreadyExists`] when the DN is taken.
    async fn create(&self, dn: &str, attributes: AttributeSet) -> ConnectorResult<Uid>;
}

/// Capability for modifying entry attributes.
#[async_trait]
pub trait UpdateOp: Connector {
    /// Apply attribute changes to an existing entry.
    ///
    /// # Returns
    /// The UID of the updated entry.
    async fn update(&self, uid: &Uid, changes: AttributeDelta) -> ConnectorResult<Uid>;
}

/// Capability for renaming and moving entries.
#[async_trait]
pub trait RenameOp: Connector {
    /// Change the RDN of an entry, optionally moving it under `new_parent`.
    ///
    /// The old RDN value is deleted.
    ///
    /// # Returns
    /// The UID carrying the entry's new DN.
    async fn rename(
        &self,
        uid: &Uid,
        new_rdn: &str,
        new_parent: Option<&str>,
    ) -> ConnectorResult<Uid>;
}

/// Capability for deleting entries.
#[async_trait]
pub trait DeleteOp: Connector {
    /// Delete an entry.
    async fn delete(&self, uid: &Uid) -> ConnectorResult<()>;
}

/// Capability for searching the directory.
#[async_trait]
pub trait SearchOp: Connector {
    /// Run a search.
    ///
    /// A missing search base yields [`ConnectorError::ObjectNotFound`].
    async fn search(&self, request: SearchRequest) -> ConnectorResult<SearchResult>;

    /// Read a single entry by DN.
    ///
    /// Returns `Ok(None)` when the entry does not exist.
    async fn get(&self, dn: &str, attributes: &[&str]) -> ConnectorResult<Option<AttributeSet>> {
        let request = SearchRequest::new(dn, Filter::present("objectClass"))
            .with_scope(SearchScope::Base)
            .with_attributes(attributes);

        match self.search(request).await {
            Ok(result) => Ok(result.objects.into_iter().next()),
            Err(ConnectorError::ObjectNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Marker trait for connectors that support every directory operation.
pub trait Directory: CreateOp + UpdateOp + RenameOp + DeleteOp + SearchOp {}

// Blanket implementation for any connector that implements all ops
impl<T> Directory for T where T: CreateOp + UpdateOp + RenameOp + DeleteOp + SearchOp {}
