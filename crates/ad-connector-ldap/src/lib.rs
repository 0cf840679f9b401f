//! # AD LDAP Connector
//!
//! Active Directory client and request builders.
//!
//! This crate connects to an AD domain controller over LDAP/LDAPS and knows
//! how AD wants computers, groups, organizational units and users to be
//! written.
//!
//! ## Features
//!
//! - Lazy, cached connection with simple bind as `user@domain`
//! - SSL/TLS with optional certificate verification
//! - Extended-DN control for objectGUID-stable identities
//! - unicodePwd password encoding
//! - DN parsing and escaping helpers
//!
//! ## Example
//!
//! ```ignore
//! use ad_connector_ldap::{ActiveDirectoryConfig, LdapDirectory};
//! use ad_connector::prelude::*;
//!
//! let config = ActiveDirectoryConfig::from_domain("example.com", "admin", "secret")
//!     .with_host("10.0.0.5");
//!
//! let directory = LdapDirectory::new(config)?;
//! directory.test_connection().await?;
//! ```

pub mod ad;
pub mod config;
pub mod connector;
pub mod dn;

// Re-exports
pub use config::{bind_principal, ActiveDirectoryConfig, LdapConfig};
pub use connector::{escape_ldap_value, filter_to_ldap, LdapDirectory};
pub use dn::{parse_dn, parse_extended_dn, ExtendedDn};
