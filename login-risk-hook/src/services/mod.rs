pub mod actions;
pub mod error;
pub mod idp_admin;
pub mod metrics;
pub mod orchestrator;
pub mod risk_client;
pub mod signals;

pub use actions::{CommandRecorder, LoginActions, LoginCommand};
pub use error::{HookError, Upstream};
pub use idp_admin::{AccountAdmin, IdpAdminClient, ServiceCredential};
pub use metrics::{get_metrics, init_metrics};
pub use orchestrator::{DecisionOrchestrator, DecisionOutcome};
pub use risk_client::{RiskAssessor, RiskClient};
