//! Outbound HTTP calls against the provider endpoints.

use crate::config::{ClientAuthMethod, ProviderConfig, UserInfoAuth};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::types::{ProviderErrorBody, TokenResponse};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const USER_AGENT: &str = "Arena-OAuth";

/// Stateless client for the token-exchange and profile-fetch calls.
#[derive(Clone)]
pub struct ProviderClient {
    http_client: Client,
}

impl ProviderClient {
    pub fn new(http_timeout_seconds: u64) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client }
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        config: &ProviderConfig,
        code: &str,
    ) -> OAuth2Result<TokenResponse> {
        let response = match config.client_auth {
            ClientAuthMethod::ClientSecretQuery => {
                self.http_client
                    .get(&config.token_endpoint)
                    .query(&[
                        ("grant_type", "authorization_code"),
                        ("client_id", config.client_id.as_str()),
                        ("client_secret", config.client_secret.as_str()),
                        ("code", code),
                        ("redirect_uri", config.callback_url.as_str()),
                    ])
                    .send()
                    .await?
            }
            ClientAuthMethod::ClientSecretBasic => {
                let params = [
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", config.callback_url.as_str()),
                ];
                self.http_client
                    .post(&config.token_endpoint)
                    .basic_auth(&config.client_id, Some(&config.client_secret))
                    .form(&params)
                    .send()
                    .await?
            }
        };

        let body = read_json(response, "token exchange").await?;

        if let Some(declared) = provider_error(&body) {
            error!("Token exchange rejected by provider: {}", declared.error);
            return Err(OAuth2Error::ProviderToken {
                error: declared.error,
                description: declared.error_description,
                uri: declared.error_uri,
            });
        }

        let token: TokenResponse = serde_json::from_value(body).map_err(|e| {
            OAuth2Error::ProviderUnavailable(format!("malformed token response: {e}"))
        })?;

        info!("Exchanged authorization code for access token");
        Ok(token)
    }

    /// Fetch the raw user profile with a freshly granted access token.
    pub async fn fetch_profile(
        &self,
        config: &ProviderConfig,
        access_token: &str,
    ) -> OAuth2Result<Value> {
        let request = self.http_client.get(&config.userinfo_endpoint);
        let request = match &config.user_info_auth {
            UserInfoAuth::Bearer => request.bearer_auth(access_token),
            UserInfoAuth::Header(name) => request.header(name.as_str(), access_token),
            UserInfoAuth::Query(name) => request.query(&[(name.as_str(), access_token)]),
        };

        let response = request.send().await?;
        let body = read_json(response, "profile fetch").await?;

        // Provider-declared errors are passed through, never swallowed.
        if let Some(declared) = provider_error(&body) {
            error!("Profile fetch rejected by provider: {}", declared.error);
            return Err(OAuth2Error::ProviderToken {
                error: declared.error,
                description: declared.error_description,
                uri: declared.error_uri,
            });
        }

        debug!("Fetched raw profile from {}", config.userinfo_endpoint);
        Ok(body)
    }
}

/// Read a response body as JSON, peeling one optional `data` envelope.
///
/// A provider-declared error body takes precedence over a non-2xx status;
/// providers pair `invalid_grant`-style bodies with 4xx responses.
async fn read_json(response: reqwest::Response, call: &str) -> OAuth2Result<Value> {
    let status = response.status();

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            error!("{} returned an unreadable body (status {})", call, status);
            return Err(OAuth2Error::ProviderUnavailable(format!(
                "{call} failed with status {status}: {e}"
            )));
        }
    };

    let body = peel_envelope(&body);

    if provider_error(&body).is_none() && !status.is_success() {
        error!("{} failed with status {}", call, status);
        return Err(OAuth2Error::ProviderUnavailable(format!(
            "{call} failed with status {status}"
        )));
    }

    Ok(body)
}

/// Unwrap a response enveloped under a `data` field. Only one layer is
/// peeled, and never when the body carries a top-level `error`.
fn peel_envelope(body: &Value) -> Value {
    match body.get("data") {
        Some(inner) if inner.is_object() && body.get("error").is_none() => inner.clone(),
        _ => body.clone(),
    }
}

/// Extract a provider-declared error triple from a response body, if any.
///
/// Some providers report numeric error codes; those are coerced to strings.
/// An explicit `"error": null` means no error.
fn provider_error(body: &Value) -> Option<ProviderErrorBody> {
    let error = match body.get("error") {
        None | Some(Value::Null) => return None,
        Some(Value::String(code)) => code.clone(),
        Some(other) => other.to_string(),
    };

    Some(ProviderErrorBody {
        error,
        error_description: body
            .get("error_description")
            .and_then(Value::as_str)
            .map(String::from),
        error_uri: body.get("error_uri").and_then(Value::as_str).map(String::from),
    })
}
