//! OAuth2 configuration types.

use serde::{Deserialize, Serialize};

/// How client credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// `client_id`/`client_secret` as query parameters on a GET request.
    #[default]
    ClientSecretQuery,
    /// HTTP Basic credentials on a form POST.
    ClientSecretBasic,
}

/// How the user-info request carries the access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInfoAuth {
    /// `Authorization: Bearer <token>`.
    #[default]
    Bearer,
    /// Token in a provider-named request header.
    Header(String),
    /// Token in a provider-named query parameter.
    Query(String),
}

/// Field-name table mapping one provider's profile shape onto the canonical
/// record.
///
/// Providers use different names for the same facts (`openId` vs `id`,
/// `name` vs `nickname`, `ojUid` vs `uid`), so the mapper is driven by this
/// table instead of per-provider branches in the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFieldMap {
    /// Stable account identifier field.
    pub external_id: String,
    pub email: String,
    /// Username candidate fields, tried in order.
    pub username_fields: Vec<String>,
    pub avatar: Option<String>,
    /// Fields copied into the record's `extra` bag untouched.
    pub passthrough: Vec<String>,
}

impl Default for ProfileFieldMap {
    fn default() -> Self {
        Self {
            external_id: "sub".to_string(),
            email: "email".to_string(),
            username_fields: vec!["name".to_string()],
            avatar: Some("picture".to_string()),
            passthrough: Vec::new(),
        }
    }
}

/// Immutable configuration for one provider integration, fully resolved by
/// the host before a flow is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    /// This system's fixed callback URL, as registered with the provider.
    pub callback_url: String,
    pub scopes: Vec<String>,
    /// Scope that must be granted for the profile fetch to be allowed.
    pub required_scope: Option<String>,
    #[serde(default)]
    pub client_auth: ClientAuthMethod,
    #[serde(default)]
    pub user_info_auth: UserInfoAuth,
    #[serde(default)]
    pub profile_fields: ProfileFieldMap,
}

/// Flow-level tunables.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub state_ttl_seconds: u64,
    pub http_timeout_seconds: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            state_ttl_seconds: 600, // 10 minutes
            http_timeout_seconds: 30,
        }
    }
}

impl OAuth2Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
