#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use login_risk_hook::config::{
    DecisionConfig, Environment, HookConfig, HookEndpointConfig, HttpConfig,
    IdentityProviderConfig, RiskFailurePolicy, RiskServiceConfig,
};
use login_risk_hook::{build_router, AppState};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "test-key";
/// base64("test-key:")
pub const TEST_BASIC_AUTH: &str = "Basic dGVzdC1rZXk6";
pub const TEST_MGMT_TOKEN: &str = "mgmt-token";

pub struct TestHook {
    pub router: Router,
    pub risk_server: MockServer,
    pub idp_server: MockServer,
}

pub struct TestOptions {
    pub test_mode: bool,
    pub policy: RiskFailurePolicy,
    pub timeout_ms: u64,
    pub shared_secret: Option<&'static str>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            test_mode: false,
            policy: RiskFailurePolicy::RequireVerification,
            timeout_ms: 2000,
            shared_secret: None,
        }
    }
}

pub fn test_config(risk_url: &str, idp_url: &str, options: &TestOptions) -> HookConfig {
    HookConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "login-risk-hook-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        risk_service: RiskServiceConfig {
            site_id: "site42".to_string(),
            api_key: Secret::new(TEST_API_KEY.to_string()),
            api_version: "2.36".to_string(),
            client_tag: "login-risk-hook".to_string(),
            base_url: risk_url.to_string(),
        },
        identity_provider: IdentityProviderConfig {
            tenant_url: idp_url.to_string(),
            client_id: "test-client".to_string(),
            client_secret: Secret::new("test-client-secret".to_string()),
        },
        decision: DecisionConfig {
            test_mode: options.test_mode,
            risk_failure_policy: options.policy,
        },
        http: HttpConfig {
            timeout_ms: options.timeout_ms,
        },
        hook: HookEndpointConfig {
            shared_secret: options.shared_secret.map(|s| Secret::new(s.to_string())),
        },
    }
}

impl TestHook {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let risk_server = MockServer::start().await;
        let idp_server = MockServer::start().await;

        let config = test_config(&risk_server.uri(), &idp_server.uri(), &options);
        let state = AppState::from_config(&config).expect("Failed to build hook state");

        TestHook {
            router: build_router(state),
            risk_server,
            idp_server,
        }
    }

    pub async fn post_login(&self, event: Value) -> (StatusCode, Value) {
        self.post_login_with_auth(event, None).await
    }

    pub async fn post_login_with_auth(
        &self,
        event: Value,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/hooks/post-login")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(Body::from(event.to_string()))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, body)
    }
}

pub fn login_event(user_id: &str, email: &str, logins_count: u64, method: &str) -> Value {
    json!({
        "user": {"user_id": user_id, "email": email},
        "request": {
            "ip": "198.51.100.20",
            "user_agent": "Mozilla/5.0",
            "query": {"forterToken": "ftr-token"}
        },
        "stats": {"logins_count": logins_count},
        "authentication": {"methods": [{"name": method}]}
    })
}
