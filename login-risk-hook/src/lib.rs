pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use secrecy::Secret;
use std::sync::Arc;

use config::HookConfig;
use services::{DecisionOrchestrator, HookError, IdpAdminClient, RiskClient};

pub use startup::{build_router, Application};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DecisionOrchestrator>,
    pub hook_secret: Option<Secret<String>>,
}

impl AppState {
    /// Construct both outbound clients once; they share nothing but their pools.
    pub fn from_config(config: &HookConfig) -> Result<Self, HookError> {
        let timeout = config.http.timeout();
        let risk = RiskClient::new(config.risk_service.clone(), timeout)?;
        let admin = IdpAdminClient::new(config.identity_provider.clone(), timeout)?;

        let orchestrator =
            DecisionOrchestrator::new(Arc::new(risk), Arc::new(admin), config.decision.clone());

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            hook_secret: config.hook.shared_secret.clone(),
        })
    }
}
