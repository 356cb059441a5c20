//! Identity-provider management client: client-credentials token exchange
//! and the user patch that blocks an account.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::time::Duration;
use tracing::instrument;

use super::error::{HookError, Upstream};
use super::signals::encode_account_id;
use crate::config::IdentityProviderConfig;

const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Short-lived bearer token for the management API.
#[derive(Debug, Deserialize)]
pub struct ServiceCredential {
    access_token: Secret<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl ServiceCredential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            expires_in: None,
            token_type: None,
        }
    }

    pub fn bearer(&self) -> &str {
        self.access_token.expose_secret()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: String,
    grant_type: &'static str,
}

#[derive(Debug, Serialize)]
struct BlockDirective {
    blocked: bool,
}

/// Administrative operations against the identity provider.
#[async_trait]
pub trait AccountAdmin: Send + Sync {
    async fn acquire_service_token(&self) -> Result<ServiceCredential, HookError>;

    /// Mark the account as blocked. Blocking an already-blocked account succeeds.
    async fn block_account(
        &self,
        account_id: &str,
        credential: &ServiceCredential,
    ) -> Result<(), HookError>;
}

#[derive(Clone)]
pub struct IdpAdminClient {
    client: Client,
    config: IdentityProviderConfig,
}

impl IdpAdminClient {
    pub fn new(config: IdentityProviderConfig, timeout: Duration) -> Result<Self, HookError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HookError::Config(format!("Failed to build identity provider HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn user_url(&self, account_id: &str) -> String {
        format!(
            "{}/api/v2/users/{}",
            self.config.tenant_url,
            encode_account_id(account_id)
        )
    }

    async fn error_status(response: reqwest::Response) -> HookError {
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read identity provider error body");
                format!("<unreadable body: {}>", e)
            }
        };
        HookError::Status {
            upstream: Upstream::IdentityProvider,
            status,
            body,
        }
    }
}

#[async_trait]
impl AccountAdmin for IdpAdminClient {
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    async fn acquire_service_token(&self) -> Result<ServiceCredential, HookError> {
        let url = format!("{}/oauth/token", self.config.tenant_url);
        let request = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
            audience: self.config.audience(),
            grant_type: CLIENT_CREDENTIALS_GRANT,
        };

        let response = self
            .client
            .traced_post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token request to identity provider failed");
                HookError::transport(Upstream::IdentityProvider, e)
            })?;

        if !response.status().is_success() {
            let err = Self::error_status(response).await;
            tracing::error!(error = %err, "Identity provider refused client-credentials grant");
            return Err(err);
        }

        let credential: ServiceCredential =
            response.json().await.map_err(|e| HookError::MalformedResponse {
                upstream: Upstream::IdentityProvider,
                message: e.to_string(),
            })?;

        tracing::debug!(expires_in = ?credential.expires_in, "Service credential acquired");
        Ok(credential)
    }

    #[instrument(skip(self, credential), fields(account_id = %account_id))]
    async fn block_account(
        &self,
        account_id: &str,
        credential: &ServiceCredential,
    ) -> Result<(), HookError> {
        let url = self.user_url(account_id);

        let response = self
            .client
            .traced_patch(&url)
            .bearer_auth(credential.bearer())
            .json(&BlockDirective { blocked: true })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Block request to identity provider failed");
                HookError::transport(Upstream::IdentityProvider, e)
            })?;

        if !response.status().is_success() {
            let err = Self::error_status(response).await;
            tracing::error!(error = %err, "Identity provider rejected block update");
            return Err(err);
        }

        tracing::info!("Account blocked at identity provider");
        Ok(())
    }
}
