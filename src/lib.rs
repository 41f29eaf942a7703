//! PrivX connector
//!
//! Exposes PrivX users and roles as resources, role membership as
//! entitlements and grants, and grants/revokes role membership.

#![deny(clippy::all)]

pub mod auth;
pub mod config;
pub mod connector;
pub mod error;
pub mod pagination;
pub mod privx;
pub mod secret;
pub mod sync;

pub use config::Config;
pub use connector::{PrivxConnector, ResourceProvisioner, ResourceSyncer};
pub use error::{ConnectorError, ConnectorResult};
pub use pagination::PageToken;
