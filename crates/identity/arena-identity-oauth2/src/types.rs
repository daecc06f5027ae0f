//! OAuth2 protocol types.

use serde::{Deserialize, Serialize};

/// Query parameters delivered to the callback endpoint by the provider
/// redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackParams {
    pub state: String,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub error_uri: Option<String>,
}

/// Result of a successful code exchange. Held only long enough to drive the
/// profile fetch, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Granted scopes. Providers delimit with spaces or commas; both are
    /// accepted.
    pub fn granted_scopes(&self) -> Vec<String> {
        self.scope.as_deref().map(split_scopes).unwrap_or_default()
    }
}

pub(crate) fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Provider-declared error triple carried in a JSON response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}
