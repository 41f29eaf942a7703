//! PrivX authentication.
//!
//! Provides the OAuth client-credentials exchange and a token manager that
//! reuses the issued bearer token until shortly before it expires.

pub mod oauth;
pub mod token_manager;

pub use oauth::{OAuthClient, TokenResponse};
pub use token_manager::TokenManager;
