// event.rs — Audit event data model.
//
// Each gateway call is recorded as one AuditEvent. Events form a chain:
// each event includes a `previous_hash` linking it to the prior line,
// enabling tamper detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hasher;

/// What happened to the command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Policy refused the command; nothing ran.
    CommandBlocked,
    /// The command ran to completion.
    CommandExecuted,
    /// The command ran and was killed at its timeout.
    CommandTimedOut,
    /// The process runner could not run the command at all.
    RunnerFailed,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::CommandBlocked => "command_blocked",
            AuditAction::CommandExecuted => "command_executed",
            AuditAction::CommandTimedOut => "command_timed_out",
            AuditAction::RunnerFailed => "runner_failed",
        }
    }
}

/// A single audit event — one line in the JSONL audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this event.
    pub event_id: Uuid,

    /// When this event occurred (UTC).
    pub timestamp: DateTime<Utc>,

    /// Who submitted the command (agent id, user, "cli").
    pub actor: String,

    pub action: AuditAction,

    /// The command text exactly as submitted.
    pub command: String,

    /// SHA-256 of the command text.
    pub input_hash: String,

    /// SHA-256 of captured stdout and stderr, when the command ran.
    pub output_hash: Option<String>,

    /// Hash of the previous line in the log. `None` for the first event.
    pub previous_hash: Option<String>,

    /// The gateway's result (or error), embedded verbatim.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    /// Create a new event with the current timestamp, a random UUID, and
    /// the command's input hash.
    pub fn new(actor: impl Into<String>, action: AuditAction, command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            input_hash: hasher::hash_str(&command),
            command,
            output_hash: None,
            previous_hash: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Record the hash of the captured output and return self (builder pattern).
    pub fn with_output(mut self, stdout: &str, stderr: &str) -> Self {
        self.output_hash = Some(hasher::hash_parts(&[stdout, stderr]));
        self
    }

    /// Set arbitrary metadata and return self.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_hashes_command() {
        let event = AuditEvent::new("agent-1", AuditAction::CommandBlocked, "rm -rf /");
        assert_eq!(event.input_hash, hasher::hash_str("rm -rf /"));
        assert!(event.output_hash.is_none());
        assert!(event.previous_hash.is_none());
    }

    #[test]
    fn output_hash_covers_both_streams() {
        let a = AuditEvent::new("a", AuditAction::CommandExecuted, "ls").with_output("x", "");
        let b = AuditEvent::new("a", AuditAction::CommandExecuted, "ls").with_output("", "x");
        assert_ne!(a.output_hash, b.output_hash);
    }

    #[test]
    fn event_ids_are_unique() {
        let e1 = AuditEvent::new("agent", AuditAction::CommandExecuted, "ls");
        let e2 = AuditEvent::new("agent", AuditAction::CommandExecuted, "ls");
        assert_ne!(e1.event_id, e2.event_id);
    }

    #[test]
    fn action_serializes_as_snake_case() {
        let json = serde_json::to_string(&AuditAction::CommandTimedOut).unwrap();
        assert_eq!(json, "\"command_timed_out\"");
        assert_eq!(json.trim_matches('"'), AuditAction::CommandTimedOut.as_str());
    }

    #[test]
    fn metadata_is_embedded_verbatim() {
        let result = serde_json::json!({"status": "blocked", "exit_code": null});
        let event = AuditEvent::new("cli", AuditAction::CommandBlocked, "curl x")
            .with_metadata(result.clone());

        let line = serde_json::to_string(&event).unwrap();
        let restored: AuditEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(restored.metadata, result);
        assert_eq!(restored.action, AuditAction::CommandBlocked);
    }
}
