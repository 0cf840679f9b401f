//! # Connector Framework
//!
//! Core abstractions for managing Active Directory objects over LDAP.
//!
//! The framework uses a capability-based trait system:
//!
//! - [`Connector`] - Base trait all connectors implement
//! - [`CreateOp`], [`UpdateOp`], [`RenameOp`], [`DeleteOp`] - write operations
//! - [`SearchOp`] - Search and retrieve entries
//! - [`Directory`] - every capability at once, usable as `&dyn Directory`
//!
//! ## Example
//!
//! ```ignore
//! use ad_connector::prelude::*;
//!
//! let attrs = AttributeSet::new()
//!     .with("objectClass", vec!["top".to_string(), "group".to_string()])
//!     .with("sAMAccountName", "Admins");
//! let uid = directory.create("cn=Admins,ou=Groups,dc=example,dc=com", attrs).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Connector capability traits
//! - [`operation`] - Operation types (Uid, `AttributeSet`, Filter, `SearchRequest`)
//! - [`config`] - Configuration types and traits
//!
//! [`Connector`]: traits::Connector
//! [`CreateOp`]: traits::CreateOp
//! [`UpdateOp`]: traits::UpdateOp
//! [`RenameOp`]: traits::RenameOp
//! [`DeleteOp`]: traits::DeleteOp
//! [`SearchOp`]: traits::SearchOp
//! [`Directory`]: traits::Directory

pub mod config;
pub mod error;
pub mod operation;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use ad_connector::prelude::*;
/// ```
pub mod prelude {
    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult};

    // Traits
    pub use crate::traits::{
        Connector, CreateOp, DeleteOp, Directory, RenameOp, SearchOp, UpdateOp,
    };

    // Operations
    pub use crate::operation::{
        AttributeDelta, AttributeSet, AttributeValue, Filter, SearchRequest, SearchResult,
        SearchScope, Uid,
    };

    // Configuration
    pub use crate::config::{ConnectionSettings, ConnectorConfig, TlsConfig, REDACTED};
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
