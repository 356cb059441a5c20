//! Caller-facing action surface.
//!
//! The identity provider runtime owns the real `deny` and `multifactor`
//! operations; the hook records what it wants done and hands the commands
//! back in its response.

use serde::Serialize;

/// Message shown to a user whose login is denied.
pub const ACCESS_DENIED_MESSAGE: &str = "sorry, something went wrong.";

/// Multi-factor policy that accepts any enrolled factor.
pub const MFA_ANY_PROVIDER: &str = "any";

pub trait LoginActions: Send {
    fn deny_access(&mut self, reason: &str);

    fn enable_multifactor(&mut self, provider: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoginCommand {
    DenyAccess { reason: String },
    EnableMultifactor { provider: String },
}

/// Collects issued actions in call order.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<LoginCommand>,
}

impl CommandRecorder {
    pub fn commands(&self) -> &[LoginCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<LoginCommand> {
        self.commands
    }
}

impl LoginActions for CommandRecorder {
    fn deny_access(&mut self, reason: &str) {
        self.commands.push(LoginCommand::DenyAccess {
            reason: reason.to_string(),
        });
    }

    fn enable_multifactor(&mut self, provider: &str) {
        self.commands.push(LoginCommand::EnableMultifactor {
            provider: provider.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_serialize_as_tagged_objects() {
        let mut recorder = CommandRecorder::default();
        recorder.enable_multifactor(MFA_ANY_PROVIDER);
        recorder.deny_access(ACCESS_DENIED_MESSAGE);

        assert_eq!(
            serde_json::to_value(recorder.commands()).unwrap(),
            json!([
                {"type": "enable_multifactor", "provider": "any"},
                {"type": "deny_access", "reason": "sorry, something went wrong."}
            ])
        );
    }
}
