//! Post-login event as posted by the identity provider runtime.
//!
//! Only the attributes the decision needs are modelled; unknown fields in
//! the incoming JSON are ignored.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginEvent {
    #[validate(nested)]
    pub user: EventUser,
    #[validate(nested)]
    pub request: EventRequest,
    #[serde(default)]
    pub stats: EventStats,
    #[serde(default)]
    pub authentication: Option<EventAuthentication>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EventUser {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EventRequest {
    #[validate(length(min = 1, message = "ip must not be empty"))]
    pub ip: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub query: EventQuery,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    /// Fraud-token cookie forwarded by the login page.
    #[serde(rename = "forterToken", default)]
    pub forter_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventStats {
    /// Completed logins including the current one.
    #[serde(default)]
    pub logins_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventAuthentication {
    #[serde(default)]
    pub methods: Vec<AuthenticationMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationMethod {
    pub name: String,
}
