//! Authorization Code flow orchestration.

use crate::client::ProviderClient;
use crate::config::{OAuth2Config, ProviderConfig};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::mapper::map_profile;
use crate::types::CallbackParams;
use arena_identity_core::{FederatedIdentity, TokenKind, TokenStore};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Successful flow outcome: the canonical record plus the navigation target
/// captured when the flow began.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub identity: FederatedIdentity,
    /// Post-login redirect captured at `begin_authorization`. `None` when
    /// the state payload carried no target; the host falls back to its
    /// default landing page.
    pub redirect: Option<String>,
}

/// Drives one provider's Authorization Code flow.
///
/// Each `begin_authorization`/`handle_callback` pair is an independent flow
/// instance; all cross-request state lives in the injected token store.
#[derive(Clone)]
pub struct OAuth2Flow {
    provider: ProviderConfig,
    client: ProviderClient,
    store: Arc<dyn TokenStore>,
    state_ttl_seconds: u64,
}

impl OAuth2Flow {
    pub fn new(provider: ProviderConfig, config: OAuth2Config, store: Arc<dyn TokenStore>) -> Self {
        let client = ProviderClient::new(config.http_timeout_seconds);

        Self {
            provider,
            client,
            store,
            state_ttl_seconds: config.state_ttl_seconds,
        }
    }

    /// Build the provider authorize URL for a login attempt, issuing the
    /// state token that will correlate the eventual callback.
    pub async fn begin_authorization(&self, return_to: &str) -> OAuth2Result<String> {
        let state = self
            .store
            .issue(
                TokenKind::OAuth,
                self.state_ttl_seconds,
                json!({ "redirect": return_to }),
            )
            .await?;

        let mut url = Url::parse(&self.provider.authorize_endpoint)?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.provider.client_id);
            params.append_pair("redirect_uri", &self.provider.callback_url);
            params.append_pair("state", &state);
            if !self.provider.scopes.is_empty() {
                params.append_pair("scope", &self.provider.scopes.join(" "));
            }
        }

        debug!(
            "Generated authorization URL for provider {}",
            self.provider.provider_id
        );

        Ok(url.to_string())
    }

    /// Complete the flow when the provider redirects back to the callback
    /// endpoint.
    pub async fn handle_callback(
        &self,
        params: CallbackParams,
    ) -> OAuth2Result<AuthenticatedIdentity> {
        // A provider-reported failure wins over everything else. The state
        // token is not redeemed; it expires on its own and the same login
        // attempt can be retried until then.
        if let Some(error) = params.error {
            warn!(
                "Provider {} declined authorization: {}",
                self.provider.provider_id, error
            );
            return Err(OAuth2Error::ProviderAuth {
                error,
                description: params.error_description,
                uri: params.error_uri,
            });
        }

        // Checked before redemption: a malformed callback must not burn the
        // token either.
        let code = params.code.ok_or(OAuth2Error::MissingAuthorizationCode)?;

        let payload = self.store.redeem(&params.state, TokenKind::OAuth).await?;
        let redirect = payload
            .get("redirect")
            .and_then(serde_json::Value::as_str)
            .filter(|target| !target.is_empty())
            .map(String::from);

        let token = self.client.exchange_code(&self.provider, &code).await?;

        if let (Some(required), Some(_)) = (&self.provider.required_scope, &token.scope) {
            let granted = token.granted_scopes();
            if !granted.iter().any(|scope| scope == required) {
                warn!(
                    "Provider {} granted scopes {:?} without '{}'",
                    self.provider.provider_id, granted, required
                );
                return Err(OAuth2Error::InsufficientScope {
                    required: required.clone(),
                    granted,
                });
            }
        }

        let profile = self
            .client
            .fetch_profile(&self.provider, &token.access_token)
            .await?;

        let identity = map_profile(&profile, &self.provider.profile_fields);

        // Terminal validation; the mapper itself never rejects.
        if identity.email.is_empty() {
            return Err(OAuth2Error::ForbiddenUnverifiedEmail);
        }
        if identity.external_id.is_empty() {
            return Err(OAuth2Error::ProviderUnavailable(
                "profile missing a stable account identifier".to_string(),
            ));
        }

        info!(
            "Completed authorization flow for provider {} subject {}",
            self.provider.provider_id, identity.external_id
        );

        Ok(AuthenticatedIdentity { identity, redirect })
    }
}
