// result.rs — The gateway's output record.
//
// One ExecutionResult is produced per `Gateway::execute()` call and never
// mutated afterwards. It serializes to a flat JSON object so an audit layer
// can embed it verbatim.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::Classification;

/// Terminal state of one gateway invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Policy refused the command; nothing was run.
    Blocked,
    /// The command ran to completion (with any exit code).
    Executed,
    /// The command ran but was killed at the timeout.
    TimedOut,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Blocked => "blocked",
            ExecutionStatus::Executed => "executed",
            ExecutionStatus::TimedOut => "timed_out",
        }
    }
}

/// Outcome of one gateway invocation.
///
/// Invariants:
/// - `Blocked` ⇒ `allowed == false`, `exit_code == None`, `duration == 0`.
/// - `Executed`/`TimedOut` ⇒ `allowed == true` and the runner was invoked once.
/// - `TimedOut` ⇒ `exit_code == None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The command exactly as the caller supplied it.
    pub command: String,
    pub classification: Classification,
    /// A well-formed approval for exactly this command was supplied.
    pub approved: bool,
    /// Final policy decision.
    pub allowed: bool,
    pub status: ExecutionStatus,
    pub stdout: String,
    /// Process stderr, or the block reason when `status == Blocked`.
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Wall-clock time spent in the runner, serialized as fractional seconds.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl ExecutionResult {
    /// A result for a command that policy refused to run.
    pub(crate) fn blocked(
        command: &str,
        classification: Classification,
        approved: bool,
        reason: String,
    ) -> Self {
        Self {
            command: command.to_string(),
            classification,
            approved,
            allowed: false,
            status: ExecutionStatus::Blocked,
            stdout: String::new(),
            stderr: reason,
            exit_code: None,
            duration: Duration::ZERO,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ExecutionStatus::Blocked
    }

    /// Ran and exited with code 0.
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Executed && self.exit_code == Some(0)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
