//! # AD Provider
//!
//! Declarative Active Directory resources and data sources.
//!
//! A provider host hands this crate JSON configuration and state; the
//! [`AdProvider`] validates it against the attribute schemas, plans changes
//! and drives the directory through [`ad_connector_ldap::LdapDirectory`].
//!
//! ## Resources
//!
//! - `ad_computer`, `ad_group`, `ad_ou`, `ad_user`
//! - `ad_user_attachment` (group membership of one user)
//!
//! ## Data sources
//!
//! - `ad_computer`, `ad_domain`, `ad_group`, `ad_ou`, `ad_user`
//!
//! ## Example
//!
//! ```ignore
//! use ad_provider::{AdProvider, ProviderService};
//! use serde_json::json;
//!
//! let provider = AdProvider::new();
//! provider.configure(json!({"domain": "example.com", "ip": "10.0.0.5",
//!     "user": "admin", "password": "secret"})).await?;
//!
//! let group = json!({"name": "Admins", "domain": "example.com"});
//! let plan = provider.plan("ad_group", None, group).await?;
//! let state = provider.create("ad_group", plan.planned_state).await?;
//! ```

pub mod client;
pub mod data;
pub mod data_sources;
pub mod error;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;

pub use client::AdClient;
pub use data::ResourceData;
pub use error::{ProviderError, ProviderResult};
pub use plan::{AttributeChange, PlanAction, PlanResult};
pub use provider::{AdProvider, ProviderService};
pub use schema::{Attribute, AttributeType, ProviderSchema, Schema};
