//! Risk-service wire types and the decision vocabulary.

use serde::{Deserialize, Deserializer, Serialize};

/// Verdict returned by the risk service.
///
/// Any value outside the three documented decisions lands in `Unrecognized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskVerdict {
    Approve,
    Decline,
    VerificationRequired,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginMethod {
    Password,
    Social,
}

/// The check only runs after the identity provider accepted the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Registration,
    Login,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Registration => "registration",
            EventType::Login => "login",
        }
    }
}

/// Terminal state of one hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    RequireVerification,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::RequireVerification => "require_verification",
        }
    }
}

/// Normalized attributes derived from a [`LoginEvent`](super::LoginEvent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSignals {
    /// Raw identifier, used in JSON bodies.
    pub account_id: String,
    pub customer_ip: String,
    pub user_agent: String,
    pub fraud_token: Option<String>,
    pub login_method: LoginMethod,
    pub event_type: EventType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInformation {
    #[serde(rename = "customerIP")]
    pub customer_ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forter_token_cookie: Option<String>,
}

/// Body of a signup or login decision request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCheckRequest {
    pub account_id: String,
    pub connection_information: ConnectionInformation,
    /// Epoch milliseconds.
    pub event_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_status: Option<LoginStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_method_type: Option<LoginMethod>,
}

impl RiskCheckRequest {
    pub fn registration(signals: &LoginSignals, event_time: i64) -> Self {
        Self {
            account_id: signals.account_id.clone(),
            connection_information: ConnectionInformation::from(signals),
            event_time,
            login_status: None,
            login_method_type: None,
        }
    }

    pub fn login(signals: &LoginSignals, event_time: i64) -> Self {
        Self {
            login_status: Some(LoginStatus::Success),
            login_method_type: Some(signals.login_method),
            ..Self::registration(signals, event_time)
        }
    }
}

impl From<&LoginSignals> for ConnectionInformation {
    fn from(signals: &LoginSignals) -> Self {
        Self {
            customer_ip: signals.customer_ip.clone(),
            user_agent: signals.user_agent.clone(),
            forter_token_cookie: signals.fraud_token.clone(),
        }
    }
}

/// Decision response; every field other than the verdict is ignored.
#[derive(Debug, Deserialize)]
pub struct RiskDecisionResponse {
    #[serde(rename = "forterDecision", default, deserialize_with = "lenient_verdict")]
    pub forter_decision: Option<RiskVerdict>,
}

/// Any decision value that is not one of the known strings, including
/// non-string JSON, reads as `Unrecognized`.
fn lenient_verdict<'de, D>(deserializer: D) -> Result<Option<RiskVerdict>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| serde_json::from_value(v).unwrap_or(RiskVerdict::Unrecognized)))
}

impl RiskDecisionResponse {
    pub fn verdict(&self) -> RiskVerdict {
        self.forter_decision.unwrap_or(RiskVerdict::Unrecognized)
    }
}
