//! OAuth2 error taxonomy.

use arena_identity_core::StoreError;
use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    /// Provider declined authorization at the redirect step. The provider's
    /// own error code, description, and URI are carried verbatim.
    #[error("provider declined authorization: {error}")]
    ProviderAuth {
        error: String,
        description: Option<String>,
        uri: Option<String>,
    },

    #[error("state parameter unknown, expired, or already used")]
    InvalidOrExpiredState,

    #[error("callback missing authorization code")]
    MissingAuthorizationCode,

    /// Provider rejected the code exchange.
    #[error("token exchange rejected: {error}")]
    ProviderToken {
        error: String,
        description: Option<String>,
        uri: Option<String>,
    },

    #[error("granted scopes {granted:?} lack required scope '{required}'")]
    InsufficientScope {
        required: String,
        granted: Vec<String>,
    },

    /// Transport failure, timeout, non-2xx status, or malformed body on an
    /// outbound call.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("account has no verified email")]
    ForbiddenUnverifiedEmail,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state store failure: {0}")]
    Store(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl OAuth2Error {
    /// Whether restarting the flow from `begin_authorization` is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }
}

impl From<reqwest::Error> for OAuth2Error {
    fn from(err: reqwest::Error) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}

impl From<StoreError> for OAuth2Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::InvalidOrExpiredState,
            StoreError::Backend(message) => Self::Store(message),
        }
    }
}
