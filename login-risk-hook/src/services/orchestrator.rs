//! Decision orchestration for one post-login event.
//!
//! ```text
//! START -> CLASSIFY -> REGISTRATION_CHECK | LOGIN_CHECK -> ALLOW | DENY | REQUIRE_VERIFICATION
//! ```
//!
//! Exactly one risk check runs per event. A registration `DECLINE` blocks the
//! account before the deny action is issued; a failed block never turns the
//! decline into an allow.

use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use super::actions::{LoginActions, ACCESS_DENIED_MESSAGE, MFA_ANY_PROVIDER};
use super::error::HookError;
use super::idp_admin::AccountAdmin;
use super::metrics;
use super::risk_client::RiskAssessor;
use super::signals::extract_signals;
use crate::config::DecisionConfig;
use crate::models::{Decision, EventType, LoginEvent, LoginSignals, RiskVerdict};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionOutcome {
    pub event_type: EventType,
    /// `None` when the risk service failed and the failure policy decided.
    pub verdict: Option<RiskVerdict>,
    pub decision: Decision,
    pub account_blocked: bool,
}

pub struct DecisionOrchestrator {
    risk: Arc<dyn RiskAssessor>,
    admin: Arc<dyn AccountAdmin>,
    settings: DecisionConfig,
}

impl DecisionOrchestrator {
    pub fn new(
        risk: Arc<dyn RiskAssessor>,
        admin: Arc<dyn AccountAdmin>,
        settings: DecisionConfig,
    ) -> Self {
        Self {
            risk,
            admin,
            settings,
        }
    }

    /// Run the decision for `event` and issue the terminal action on `actions`.
    #[instrument(skip_all, fields(account_id = %event.user.user_id))]
    pub async fn on_post_login(
        &self,
        event: &LoginEvent,
        actions: &mut dyn LoginActions,
    ) -> Result<DecisionOutcome, HookError> {
        let signals = extract_signals(event, self.settings.test_mode);

        let outcome = match signals.event_type {
            EventType::Registration => self.registration_check(&signals).await?,
            EventType::Login => self.login_check(&signals).await?,
        };

        match outcome.decision {
            Decision::Deny => actions.deny_access(ACCESS_DENIED_MESSAGE),
            Decision::RequireVerification => actions.enable_multifactor(MFA_ANY_PROVIDER),
            Decision::Allow => {}
        }

        tracing::info!(
            event_type = outcome.event_type.as_str(),
            verdict = ?outcome.verdict,
            decision = outcome.decision.as_str(),
            account_blocked = outcome.account_blocked,
            "Login risk decision applied"
        );
        metrics::record_decision(outcome.event_type.as_str(), outcome.decision.as_str());

        Ok(outcome)
    }

    async fn registration_check(&self, signals: &LoginSignals) -> Result<DecisionOutcome, HookError> {
        let verdict = match self.risk.check_registration(signals).await {
            Ok(verdict) => verdict,
            Err(err) => return self.fall_back(EventType::Registration, err),
        };

        let (decision, account_blocked) = match verdict {
            RiskVerdict::Decline => (Decision::Deny, self.block(&signals.account_id).await),
            // Registration-time step-up is not supported; the account may proceed.
            RiskVerdict::Approve | RiskVerdict::VerificationRequired => (Decision::Allow, false),
            RiskVerdict::Unrecognized => {
                tracing::warn!("Unrecognized registration verdict, allowing login");
                (Decision::Allow, false)
            }
        };

        Ok(DecisionOutcome {
            event_type: EventType::Registration,
            verdict: Some(verdict),
            decision,
            account_blocked,
        })
    }

    async fn login_check(&self, signals: &LoginSignals) -> Result<DecisionOutcome, HookError> {
        let verdict = match self.risk.check_login(signals).await {
            Ok(verdict) => verdict,
            Err(err) => return self.fall_back(EventType::Login, err),
        };

        let decision = match verdict {
            RiskVerdict::Decline => Decision::Deny,
            RiskVerdict::VerificationRequired => Decision::RequireVerification,
            RiskVerdict::Approve => Decision::Allow,
            RiskVerdict::Unrecognized => {
                tracing::warn!("Unrecognized login verdict, allowing login");
                Decision::Allow
            }
        };

        Ok(DecisionOutcome {
            event_type: EventType::Login,
            verdict: Some(verdict),
            decision,
            account_blocked: false,
        })
    }

    /// Block the account; reports whether the identity provider accepted it.
    async fn block(&self, account_id: &str) -> bool {
        match self.acquire_and_block(account_id).await {
            Ok(()) => {
                metrics::record_block("blocked");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to block declined account, denying login anyway");
                metrics::record_block("failed");
                false
            }
        }
    }

    async fn acquire_and_block(&self, account_id: &str) -> Result<(), HookError> {
        // Credential is fetched per block and never reused.
        let credential = self.admin.acquire_service_token().await?;
        self.admin.block_account(account_id, &credential).await
    }

    fn fall_back(&self, event_type: EventType, err: HookError) -> Result<DecisionOutcome, HookError> {
        let Some(decision) = self.settings.risk_failure_policy.fallback_decision() else {
            tracing::error!(error = %err, event_type = event_type.as_str(), "Risk check failed");
            return Err(err);
        };

        tracing::warn!(
            error = %err,
            event_type = event_type.as_str(),
            decision = decision.as_str(),
            "Risk check failed, applying failure policy"
        );
        metrics::record_fallback(event_type.as_str());

        Ok(DecisionOutcome {
            event_type,
            verdict: None,
            decision,
            account_blocked: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskFailurePolicy;
    use crate::services::actions::{CommandRecorder, LoginCommand};
    use crate::services::error::Upstream;
    use crate::services::idp_admin::ServiceCredential;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct FakeRisk {
        verdict: Option<RiskVerdict>,
        calls: CallLog,
        seen: Mutex<Vec<LoginSignals>>,
    }

    #[async_trait]
    impl RiskAssessor for FakeRisk {
        async fn check_registration(&self, signals: &LoginSignals) -> Result<RiskVerdict, HookError> {
            self.calls.lock().unwrap().push("check_registration".to_string());
            self.seen.lock().unwrap().push(signals.clone());
            self.respond()
        }

        async fn check_login(&self, signals: &LoginSignals) -> Result<RiskVerdict, HookError> {
            self.calls.lock().unwrap().push("check_login".to_string());
            self.seen.lock().unwrap().push(signals.clone());
            self.respond()
        }
    }

    impl FakeRisk {
        fn respond(&self) -> Result<RiskVerdict, HookError> {
            self.verdict.ok_or(HookError::Timeout {
                upstream: Upstream::RiskService,
            })
        }
    }

    struct FakeAdmin {
        fail_token: bool,
        calls: CallLog,
    }

    #[async_trait]
    impl AccountAdmin for FakeAdmin {
        async fn acquire_service_token(&self) -> Result<ServiceCredential, HookError> {
            self.calls.lock().unwrap().push("acquire_service_token".to_string());
            if self.fail_token {
                return Err(HookError::Status {
                    upstream: Upstream::IdentityProvider,
                    status: 401,
                    body: "access_denied".to_string(),
                });
            }
            Ok(ServiceCredential::new("token"))
        }

        async fn block_account(
            &self,
            account_id: &str,
            credential: &ServiceCredential,
        ) -> Result<(), HookError> {
            assert_eq!(credential.bearer(), "token");
            self.calls.lock().unwrap().push(format!("block_account:{}", account_id));
            Ok(())
        }
    }

    /// Records actions into the shared call log so ordering against the
    /// block call can be asserted.
    struct LoggedActions {
        calls: CallLog,
        inner: CommandRecorder,
    }

    impl LoginActions for LoggedActions {
        fn deny_access(&mut self, reason: &str) {
            self.calls.lock().unwrap().push("deny_access".to_string());
            self.inner.deny_access(reason);
        }

        fn enable_multifactor(&mut self, provider: &str) {
            self.calls.lock().unwrap().push("enable_multifactor".to_string());
            self.inner.enable_multifactor(provider);
        }
    }

    struct Harness {
        orchestrator: DecisionOrchestrator,
        risk: Arc<FakeRisk>,
        calls: CallLog,
    }

    fn harness(verdict: Option<RiskVerdict>, policy: RiskFailurePolicy, test_mode: bool) -> Harness {
        harness_with(verdict, policy, test_mode, false)
    }

    fn harness_with(
        verdict: Option<RiskVerdict>,
        policy: RiskFailurePolicy,
        test_mode: bool,
        fail_token: bool,
    ) -> Harness {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let risk = Arc::new(FakeRisk {
            verdict,
            calls: calls.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let admin = Arc::new(FakeAdmin {
            fail_token,
            calls: calls.clone(),
        });
        let orchestrator = DecisionOrchestrator::new(
            risk.clone(),
            admin,
            DecisionConfig {
                test_mode,
                risk_failure_policy: policy,
            },
        );
        Harness {
            orchestrator,
            risk,
            calls,
        }
    }

    fn event(account: &str, email: &str, logins: u64, method: &str) -> LoginEvent {
        serde_json::from_value(json!({
            "user": {"user_id": account, "email": email},
            "request": {"ip": "198.51.100.20", "user_agent": "Mozilla/5.0", "query": {"forterToken": "ftr"}},
            "stats": {"logins_count": logins},
            "authentication": {"methods": [{"name": method}]}
        }))
        .unwrap()
    }

    async fn run(h: &Harness, event: &LoginEvent) -> (Result<DecisionOutcome, HookError>, Vec<LoginCommand>) {
        let mut actions = LoggedActions {
            calls: h.calls.clone(),
            inner: CommandRecorder::default(),
        };
        let result = h.orchestrator.on_post_login(event, &mut actions).await;
        (result, actions.inner.into_commands())
    }

    fn calls(h: &Harness) -> Vec<String> {
        h.calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn declined_registration_blocks_then_denies() {
        let h = harness(Some(RiskVerdict::Decline), RiskFailurePolicy::Fail, true);
        let (result, commands) = run(&h, &event("u1", "decline@x.com", 1, "pwd")).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.decision, Decision::Deny);
        assert!(outcome.account_blocked);
        assert_eq!(
            calls(&h),
            vec![
                "check_registration",
                "acquire_service_token",
                "block_account:u1",
                "deny_access"
            ]
        );
        assert_eq!(
            commands,
            vec![LoginCommand::DenyAccess {
                reason: ACCESS_DENIED_MESSAGE.to_string()
            }]
        );
        assert_eq!(h.risk.seen.lock().unwrap()[0].customer_ip, "0.0.0.2");
    }

    #[tokio::test]
    async fn approved_or_verify_registration_takes_no_action() {
        for verdict in [RiskVerdict::Approve, RiskVerdict::VerificationRequired] {
            let h = harness(Some(verdict), RiskFailurePolicy::Fail, false);
            let (result, commands) = run(&h, &event("u1", "a@x.com", 1, "pwd")).await;

            let outcome = result.unwrap();
            assert_eq!(outcome.decision, Decision::Allow);
            assert!(!outcome.account_blocked);
            assert_eq!(calls(&h), vec!["check_registration"]);
            assert!(commands.is_empty());
        }
    }

    #[tokio::test]
    async fn login_verdicts_map_to_actions() {
        let cases = [
            (RiskVerdict::Decline, Decision::Deny, Some("deny_access")),
            (
                RiskVerdict::VerificationRequired,
                Decision::RequireVerification,
                Some("enable_multifactor"),
            ),
            (RiskVerdict::Approve, Decision::Allow, None),
            (RiskVerdict::Unrecognized, Decision::Allow, None),
        ];

        for logins in [0, 2, 5] {
            for (verdict, expected, action) in cases {
                let h = harness(Some(verdict), RiskFailurePolicy::Fail, false);
                let (result, _) = run(&h, &event("u2", "a@x.com", logins, "pwd")).await;

                assert_eq!(result.unwrap().decision, expected);
                let mut want = vec!["check_login".to_string()];
                want.extend(action.map(str::to_string));
                assert_eq!(calls(&h), want, "verdict {:?}", verdict);
            }
        }
    }

    #[tokio::test]
    async fn federated_login_requiring_verification_enables_mfa() {
        let h = harness(
            Some(RiskVerdict::VerificationRequired),
            RiskFailurePolicy::Fail,
            false,
        );
        let (result, commands) = run(&h, &event("u2", "verify@x.com", 5, "federated")).await;

        assert_eq!(result.unwrap().decision, Decision::RequireVerification);
        let seen = h.risk.seen.lock().unwrap();
        assert_eq!(seen[0].login_method, crate::models::LoginMethod::Social);
        assert_eq!(seen[0].customer_ip, "198.51.100.20");
        assert_eq!(
            commands,
            vec![LoginCommand::EnableMultifactor {
                provider: MFA_ANY_PROVIDER.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn failed_block_still_denies() {
        let h = harness_with(Some(RiskVerdict::Decline), RiskFailurePolicy::Fail, false, true);
        let (result, commands) = run(&h, &event("u1", "a@x.com", 1, "pwd")).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.decision, Decision::Deny);
        assert!(!outcome.account_blocked);
        assert_eq!(
            calls(&h),
            vec!["check_registration", "acquire_service_token", "deny_access"]
        );
        assert_eq!(commands.len(), 1);
    }

    #[tokio::test]
    async fn risk_failure_with_fail_policy_propagates() {
        let h = harness(None, RiskFailurePolicy::Fail, false);
        let (result, commands) = run(&h, &event("u2", "a@x.com", 3, "pwd")).await;

        assert!(matches!(result, Err(HookError::Timeout { .. })));
        assert!(commands.is_empty());
    }

    #[tokio::test]
    async fn risk_failure_applies_configured_fallback_without_blocking() {
        let cases = [
            (RiskFailurePolicy::RequireVerification, Decision::RequireVerification),
            (RiskFailurePolicy::Deny, Decision::Deny),
            (RiskFailurePolicy::Allow, Decision::Allow),
        ];

        for (policy, expected) in cases {
            for logins in [1, 4] {
                let h = harness(None, policy, false);
                let (result, _) = run(&h, &event("u3", "a@x.com", logins, "pwd")).await;

                let outcome = result.unwrap();
                assert_eq!(outcome.decision, expected);
                assert_eq!(outcome.verdict, None);
                assert!(!outcome.account_blocked);
                assert!(!calls(&h).iter().any(|c| c.starts_with("block_account")));
            }
        }
    }
}
