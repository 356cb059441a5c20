//! Signal extraction: turns a raw login event into the attributes the risk
//! service needs.

use crate::models::{EventType, LoginEvent, LoginMethod, LoginSignals};

/// Ordered test-mode rules: the first keyword contained in the email wins.
pub const MOCK_IP_RULES: &[(&str, &str)] = &[
    ("approve", "0.0.0.1"),
    ("decline", "0.0.0.2"),
    ("verify", "0.0.0.4"),
];

/// Authentication method name the identity provider uses for social and
/// enterprise identity brokers.
const FEDERATED_METHOD: &str = "federated";

/// The current login is the first one ever completed by the account.
pub fn is_first_login(event: &LoginEvent) -> bool {
    event.stats.logins_count == 1
}

pub fn mock_ip_for_email(email: &str) -> Option<&'static str> {
    for (keyword, ip) in MOCK_IP_RULES {
        if email.contains(*keyword) {
            return Some(*ip);
        }
    }
    None
}

pub fn resolve_client_ip(event: &LoginEvent, test_mode: bool) -> String {
    let real_ip = &event.request.ip;
    if !test_mode {
        return real_ip.clone();
    }

    event
        .user
        .email
        .as_deref()
        .and_then(mock_ip_for_email)
        .map(str::to_string)
        .unwrap_or_else(|| real_ip.clone())
}

pub fn resolve_login_method(event: &LoginEvent) -> LoginMethod {
    let federated = event
        .authentication
        .as_ref()
        .map(|auth| auth.methods.iter().any(|m| m.name == FEDERATED_METHOD))
        .unwrap_or(false);

    if federated {
        LoginMethod::Social
    } else {
        LoginMethod::Password
    }
}

/// Percent-encode an account identifier for use as a URL path segment.
pub fn encode_account_id(account_id: &str) -> String {
    urlencoding::encode(account_id).into_owned()
}

pub fn extract_signals(event: &LoginEvent, test_mode: bool) -> LoginSignals {
    let event_type = if is_first_login(event) {
        EventType::Registration
    } else {
        EventType::Login
    };

    LoginSignals {
        account_id: event.user.user_id.clone(),
        customer_ip: resolve_client_ip(event, test_mode),
        user_agent: event.request.user_agent.clone(),
        fraud_token: event.request.query.forter_token.clone(),
        login_method: resolve_login_method(event),
        event_type,
    }
}
