use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Decision;

#[derive(Debug, Clone)]
pub struct HookConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub risk_service: RiskServiceConfig,
    pub identity_provider: IdentityProviderConfig,
    pub decision: DecisionConfig,
    pub http: HttpConfig,
    pub hook: HookEndpointConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("Unknown ENVIRONMENT '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskServiceConfig {
    pub site_id: String,
    pub api_key: Secret<String>,
    pub api_version: String,
    /// Sent as `x-forter-client` so the risk service can attribute traffic.
    pub client_tag: String,
    /// Scheme and host, without trailing slash.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    /// Tenant base URL, e.g. `https://example.eu.auth0.com`.
    pub tenant_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl IdentityProviderConfig {
    /// Management API audience for the client-credentials grant.
    pub fn audience(&self) -> String {
        format!("{}/api/v2/", self.tenant_url)
    }
}

#[derive(Debug, Clone)]
pub struct DecisionConfig {
    pub test_mode: bool,
    pub risk_failure_policy: RiskFailurePolicy,
}

/// What to do when the risk service cannot produce a verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RiskFailurePolicy {
    /// Abort the invocation; the runtime sees a failed hook.
    Fail,
    Allow,
    Deny,
    #[default]
    RequireVerification,
}

impl RiskFailurePolicy {
    /// Decision applied in place of a verdict, `None` when the error propagates.
    pub fn fallback_decision(&self) -> Option<Decision> {
        match self {
            RiskFailurePolicy::Fail => None,
            RiskFailurePolicy::Allow => Some(Decision::Allow),
            RiskFailurePolicy::Deny => Some(Decision::Deny),
            RiskFailurePolicy::RequireVerification => Some(Decision::RequireVerification),
        }
    }
}

impl FromStr for RiskFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(RiskFailurePolicy::Fail),
            "allow" => Ok(RiskFailurePolicy::Allow),
            "deny" => Ok(RiskFailurePolicy::Deny),
            "require_verification" | "mfa" => Ok(RiskFailurePolicy::RequireVerification),
            other => Err(format!("Unknown RISK_FAILURE_POLICY '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_ms: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct HookEndpointConfig {
    /// Bearer secret the runtime must present; unset disables the check.
    pub shared_secret: Option<Secret<String>>,
}

impl HookConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let var = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let site_id = var("FORTER_SITE_ID", None)?;
        let base_url = optional("FORTER_BASE_URL")
            .unwrap_or_else(|| format!("https://{}.api.forter-secure.com", site_id));

        let config = HookConfig {
            common,
            environment: environment.clone(),
            service_name: var("SERVICE_NAME", Some("login-risk-hook"))?,
            log_level: var("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: optional("OTLP_ENDPOINT"),
            risk_service: RiskServiceConfig {
                site_id,
                api_key: Secret::new(var("FORTER_KEY", None)?),
                api_version: var("FORTER_API_VERSION", Some("2.36"))?,
                client_tag: var("FORTER_CLIENT_TAG", Some("login-risk-hook"))?,
                base_url: trim_trailing_slash(base_url),
            },
            identity_provider: IdentityProviderConfig {
                tenant_url: trim_trailing_slash(var("AUTH0_TENANT", None)?),
                client_id: var("AUTH0_CLIENT_ID", None)?,
                client_secret: Secret::new(var("AUTH0_CLIENT_SECRET", None)?),
            },
            decision: DecisionConfig {
                test_mode: parse_flag(&var("IS_TEST_MODE", Some("false"))?)?,
                risk_failure_policy: var(
                    "RISK_FAILURE_POLICY",
                    Some("require_verification"),
                )?
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            http: HttpConfig {
                timeout_ms: var("HTTP_TIMEOUT_MS", Some("5000"))?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "HTTP_TIMEOUT_MS: {}",
                            e.to_string()
                        ))
                    })?,
            },
            hook: HookEndpointConfig {
                shared_secret: optional("HOOK_SHARED_SECRET").map(Secret::new),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.http.timeout_ms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "HTTP_TIMEOUT_MS must be greater than 0"
            )));
        }

        for (key, url) in [
            ("AUTH0_TENANT", &self.identity_provider.tenant_url),
            ("FORTER_BASE_URL", &self.risk_service.base_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} must be an http(s) URL",
                    key
                )));
            }
        }

        if self.risk_service.api_key.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "FORTER_KEY must not be empty"
            )));
        }

        if self.environment == Environment::Prod {
            if self.decision.test_mode {
                tracing::error!("IS_TEST_MODE is enabled in production - client IPs will be replaced for mock emails");
            }
            if self.hook.shared_secret.is_none() {
                tracing::warn!("HOOK_SHARED_SECRET is not set - the post-login hook accepts unauthenticated calls");
            }
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "Invalid boolean '{}'",
            other
        ))),
    }
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
