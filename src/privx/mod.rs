//! PrivX role-store integration.
//!
//! This module provides:
//! - Paged listing of users, roles and role members
//! - Granting and revoking a user's role membership

pub mod client;
pub mod models;

pub use client::PrivxClient;
pub use models::{GrantOutcome, Listing, RemoteRole, RemoteUser, RoleRef};
