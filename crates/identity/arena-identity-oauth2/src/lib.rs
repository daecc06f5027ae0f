//! OAuth2 Authorization Code identity federation.
//!
//! This crate drives the full third-party login sequence: issuing a
//! short-lived state token, redirecting to the provider, exchanging the
//! callback code for an access token, fetching the user profile, and
//! normalizing it into the platform's canonical identity record. Provider
//! differences (credential placement, user-info auth scheme, profile field
//! names, response envelopes) are captured in configuration rather than
//! per-provider code.

mod client;
mod config;
mod error;
mod flow;
mod mapper;
mod types;


pub use client::ProviderClient;
pub use config::{ClientAuthMethod, OAuth2Config, ProfileFieldMap, ProviderConfig, UserInfoAuth};
pub use error::{OAuth2Error, OAuth2Result};
pub use flow::{AuthenticatedIdentity, OAuth2Flow};
pub use mapper::map_profile;
pub use types::{CallbackParams, ProviderErrorBody, TokenResponse};

// Re-export common types for convenience
pub use arena_identity_core::{FederatedIdentity, InMemoryTokenStore, TokenKind, TokenStore};
