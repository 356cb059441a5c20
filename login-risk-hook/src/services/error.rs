use service_core::error::AppError;
use std::fmt;
use thiserror::Error;

/// External system a failed call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    RiskService,
    IdentityProvider,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::RiskService => f.write_str("risk service"),
            Upstream::IdentityProvider => f.write_str("identity provider"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HookError {
    #[error("{upstream} request failed: {message}")]
    Transport { upstream: Upstream, message: String },

    #[error("{upstream} returned HTTP {status}: {body}")]
    Status {
        upstream: Upstream,
        status: u16,
        body: String,
    },

    #[error("{upstream} request timed out")]
    Timeout { upstream: Upstream },

    #[error("{upstream} returned a malformed response: {message}")]
    MalformedResponse { upstream: Upstream, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HookError {
    /// Classify a reqwest failure; timeouts get their own variant.
    pub fn transport(upstream: Upstream, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HookError::Timeout { upstream }
        } else {
            HookError::Transport {
                upstream,
                message: err.to_string(),
            }
        }
    }

    pub fn upstream(&self) -> Option<Upstream> {
        match self {
            HookError::Transport { upstream, .. }
            | HookError::Status { upstream, .. }
            | HookError::Timeout { upstream }
            | HookError::MalformedResponse { upstream, .. } => Some(*upstream),
            HookError::Config(_) => None,
        }
    }
}

impl From<HookError> for AppError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::Timeout { .. } => AppError::GatewayTimeout(err.to_string()),
            HookError::Transport { .. }
            | HookError::Status { .. }
            | HookError::MalformedResponse { .. } => AppError::BadGateway(err.to_string()),
            HookError::Config(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
        }
    }
}
