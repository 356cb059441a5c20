//! Risk-service client.
//!
//! Issues signup and login decision requests and extracts the verdict from
//! the response body.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use service_core::observability::TracedClientExt;
use std::time::Duration;
use tracing::instrument;

use super::error::{HookError, Upstream};
use super::signals::encode_account_id;
use crate::config::RiskServiceConfig;
use crate::models::{LoginSignals, RiskCheckRequest, RiskDecisionResponse, RiskVerdict};

pub const API_VERSION_HEADER: &str = "api-version";
pub const CLIENT_TAG_HEADER: &str = "x-forter-client";

/// Source of risk verdicts for registration and login events.
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn check_registration(&self, signals: &LoginSignals) -> Result<RiskVerdict, HookError>;

    async fn check_login(&self, signals: &LoginSignals) -> Result<RiskVerdict, HookError>;
}

#[derive(Clone)]
pub struct RiskClient {
    client: Client,
    config: RiskServiceConfig,
}

impl RiskClient {
    /// Every request made by this client is bounded by `timeout`.
    pub fn new(config: RiskServiceConfig, timeout: Duration) -> Result<Self, HookError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HookError::Config(format!("Failed to build risk HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn decision_url(&self, flow: &str, account_id: &str) -> String {
        format!(
            "{}/v2/accounts/{}/{}",
            self.config.base_url,
            flow,
            encode_account_id(account_id)
        )
    }

    async fn request_decision(
        &self,
        url: &str,
        payload: &RiskCheckRequest,
    ) -> Result<RiskVerdict, HookError> {
        let response = self
            .client
            .traced_post(url)
            .basic_auth(self.config.api_key.expose_secret(), None)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .header(CLIENT_TAG_HEADER, &self.config.client_tag)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Risk service request failed");
                HookError::transport(Upstream::RiskService, e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HookError::transport(Upstream::RiskService, e))?;

        tracing::debug!(status = %status, "Risk service decision response");

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Risk service rejected decision request");
            return Err(HookError::Status {
                upstream: Upstream::RiskService,
                status: status.as_u16(),
                body,
            });
        }

        let decision: RiskDecisionResponse =
            serde_json::from_str(&body).map_err(|e| HookError::MalformedResponse {
                upstream: Upstream::RiskService,
                message: e.to_string(),
            })?;

        Ok(decision.verdict())
    }
}

#[async_trait]
impl RiskAssessor for RiskClient {
    #[instrument(skip(self, signals), fields(account_id = %signals.account_id))]
    async fn check_registration(&self, signals: &LoginSignals) -> Result<RiskVerdict, HookError> {
        let payload = RiskCheckRequest::registration(signals, chrono::Utc::now().timestamp_millis());
        let url = self.decision_url("signup", &signals.account_id);

        let verdict = self.request_decision(&url, &payload).await?;
        tracing::info!(verdict = ?verdict, "Registration decision received");
        Ok(verdict)
    }

    #[instrument(
        skip(self, signals),
        fields(account_id = %signals.account_id, login_method = ?signals.login_method)
    )]
    async fn check_login(&self, signals: &LoginSignals) -> Result<RiskVerdict, HookError> {
        let payload = RiskCheckRequest::login(signals, chrono::Utc::now().timestamp_millis());
        let url = self.decision_url("login", &signals.account_id);

        let verdict = self.request_decision(&url, &payload).await?;
        tracing::info!(verdict = ?verdict, "Login decision received");
        Ok(verdict)
    }
}
