// gateway.rs — Approval-gated command execution.
//
// Every command flows through `Gateway::execute()`:
//
// 1. Classify the command (network / destructive / read_only / write)
// 2. Check the approval token against the exact command text
// 3. read_only and write_non_destructive run; network and destructive run
//    only with a matching approval
// 4. Blocked → return a Blocked result, runner never touched
// 5. Allowed → hand the ORIGINAL command text to the runner, exactly once
//
// The gateway keeps no state between calls. Policy outcomes are always
// `Ok(ExecutionResult)`; only runner faults come back as `Err`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::approval::ApprovalState;
use crate::classifier::{Classification, Classifier};
use crate::config::ExecConfig;
use crate::error::ExecError;
use crate::result::{ExecutionResult, ExecutionStatus};
use crate::runner::{CommandRunner, ShellRunner};

/// The policy half of a gateway call: what would happen, without running anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub classification: Classification,
    /// What the caller supplied as approval.
    pub approval: ApprovalState,
    /// A matching approval was supplied.
    pub approved: bool,
    pub allowed: bool,
    /// Why the command is blocked; `None` when allowed.
    pub block_reason: Option<String>,
}

/// Classifies commands, enforces approvals, and runs what is allowed.
///
/// `R` defaults to [`ShellRunner`]; tests substitute a recording runner.
#[derive(Debug, Clone)]
pub struct Gateway<R = ShellRunner> {
    classifier: Classifier,
    runner: R,
}

impl Gateway<ShellRunner> {
    /// A gateway that runs allowed commands through the configured shell.
    pub fn new(config: ExecConfig) -> Self {
        let runner = ShellRunner::from_config(&config);
        Self::with_runner(config, runner)
    }
}

impl<R: CommandRunner> Gateway<R> {
    pub fn with_runner(config: ExecConfig, runner: R) -> Self {
        Self {
            classifier: Classifier::new(config),
            runner,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Decide whether `command` may run with the given approval token.
    pub fn evaluate(&self, command: &str, approval: Option<&str>) -> Decision {
        let classification = self.classifier.classify(command);
        let approval = ApprovalState::evaluate(command, approval);
        let approved = approval.is_approved();
        let allowed = matches!(
            classification,
            Classification::ReadOnly | Classification::WriteNonDestructive
        ) || approved;

        let block_reason = if classification.requires_approval() && !approved {
            Some(format!(
                "Blocked {} command {}.",
                classification,
                approval.describe()
            ))
        } else if !allowed {
            Some("Command not allowed without approval token.".to_string())
        } else {
            None
        };

        Decision {
            classification,
            approval,
            approved,
            allowed,
            block_reason,
        }
    }

    /// Evaluate `command` and, if allowed, run it with a hard `timeout`.
    ///
    /// Returns `Err` only if the runner itself fails (e.g., the shell is
    /// missing). Blocks, non-zero exits, and timeouts are all `Ok`.
    pub fn execute(
        &self,
        command: &str,
        approval: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecError> {
        let decision = self.evaluate(command, approval);

        if let Some(reason) = decision.block_reason {
            tracing::warn!(
                command,
                classification = %decision.classification,
                approval = ?decision.approval,
                "command blocked"
            );
            return Ok(ExecutionResult::blocked(
                command,
                decision.classification,
                decision.approved,
                reason,
            ));
        }

        tracing::info!(
            command,
            classification = %decision.classification,
            approved = decision.approved,
            "executing command"
        );

        let start = Instant::now();
        let output = self.runner.run(command, timeout).inspect_err(|e| {
            tracing::error!(command, "runner failed: {}", e);
        })?;
        let duration = start.elapsed();

        let status = if output.timed_out {
            tracing::warn!(command, ?timeout, "command timed out");
            ExecutionStatus::TimedOut
        } else {
            ExecutionStatus::Executed
        };

        Ok(ExecutionResult {
            command: command.to_string(),
            classification: decision.classification,
            approved: decision.approved,
            allowed: true,
            status,
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: if output.timed_out {
                None
            } else {
                output.exit_code
            },
            duration,
        })
    }

    /// [`execute`](Self::execute) with the config's default timeout.
    pub fn execute_default(
        &self,
        command: &str,
        approval: Option<&str>,
    ) -> Result<ExecutionResult, ExecError> {
        let timeout = self.classifier.config().default_timeout();
        self.execute(command, approval, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOutput;
    use std::sync::Mutex;

    /// Records every command it is asked to run and returns a canned output.
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
        output: RunOutput,
        fail: bool,
    }

    impl RecordingRunner {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &str, _timeout: Duration) -> Result<RunOutput, ExecError> {
            self.calls.lock().unwrap().push(command.to_string());
            if self.fail {
                return Err(ExecError::Spawn {
                    shell: "sh".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no shell"),
                });
            }
            Ok(self.output.clone())
        }
    }

    fn gateway_with(runner: RecordingRunner) -> Gateway<RecordingRunner> {
        Gateway::with_runner(ExecConfig::default(), runner)
    }

    fn ok_runner() -> RecordingRunner {
        RecordingRunner {
            output: RunOutput {
                stdout: "ok\n".to_string(),
                exit_code: Some(0),
                ..RunOutput::default()
            },
            ..RecordingRunner::default()
        }
    }

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn destructive_without_approval_is_blocked() {
        let gateway = gateway_with(ok_runner());
        let result = gateway.execute("rm -rf /tmp/x", None, SECOND).unwrap();

        assert!(!result.allowed);
        assert!(!result.approved);
        assert_eq!(result.status, ExecutionStatus::Blocked);
        assert_eq!(result.classification, Classification::Destructive);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.duration, Duration::ZERO);
        assert_eq!(
            result.stderr,
            "Blocked destructive command without approval token."
        );
        assert!(gateway.runner().calls().is_empty());
    }

    #[test]
    fn network_without_approval_is_blocked() {
        let gateway = gateway_with(ok_runner());
        let result = gateway
            .execute("curl https://example.com", None, SECOND)
            .unwrap();

        assert!(result.is_blocked());
        assert!(result.stderr.contains("network"));
        assert!(gateway.runner().calls().is_empty());
    }

    #[test]
    fn read_only_runs_exactly_once() {
        let gateway = gateway_with(ok_runner());
        let result = gateway.execute("ls", None, SECOND).unwrap();

        assert!(result.allowed);
        assert!(!result.approved);
        assert_eq!(result.status, ExecutionStatus::Executed);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout, "ok\n");
        assert_eq!(gateway.runner().calls(), vec!["ls"]);
    }

    #[test]
    fn substituted_destructive_command_is_blocked() {
        let gateway = gateway_with(ok_runner());
        for command in [
            "ls $(rm -rf victim)",
            "ls `rm -rf victim`",
            r#"cat "$(rm -rf victim)""#,
            "cat <(rm -rf victim)",
            "(rm -rf victim)",
        ] {
            let result = gateway.execute(command, None, SECOND).unwrap();
            assert!(result.is_blocked(), "{} should be blocked", command);
            assert_eq!(result.classification, Classification::Destructive);
        }
        assert!(gateway.runner().calls().is_empty());
    }

    #[test]
    fn huge_timeout_is_passed_through() {
        let gateway = gateway_with(ok_runner());
        let result = gateway
            .execute("ls", None, Duration::from_secs(u64::MAX))
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Executed);
    }

    #[test]
    fn approval_allows_destructive_and_runs_original_text() {
        let gateway = gateway_with(ok_runner());
        let command = "rm   -rf  /tmp/x";
        let result = gateway
            .execute(command, Some("APPROVE: rm -rf /tmp/x"), SECOND)
            .unwrap();

        assert!(result.allowed);
        assert!(result.approved);
        assert_eq!(result.status, ExecutionStatus::Executed);
        // The runner gets the caller's text, not the normalized form.
        assert_eq!(gateway.runner().calls(), vec![command]);
        assert_eq!(result.command, command);
    }

    #[test]
    fn approval_for_other_command_does_not_allow() {
        let gateway = gateway_with(ok_runner());
        let result = gateway
            .execute("rm -rf /tmp/x/y", Some("APPROVE: rm -rf /tmp/x"), SECOND)
            .unwrap();

        assert!(result.is_blocked());
        assert!(!result.approved);
        assert!(result.stderr.contains("different command"));
        assert!(gateway.runner().calls().is_empty());
    }

    #[test]
    fn malformed_approval_is_treated_as_absent() {
        let gateway = gateway_with(ok_runner());
        let result = gateway
            .execute("rm x", Some("approve: rm x"), SECOND)
            .unwrap();

        assert!(result.is_blocked());
        assert!(result.stderr.contains("malformed"));
        assert!(gateway.runner().calls().is_empty());
    }

    #[test]
    fn approval_on_safe_command_is_recorded() {
        let gateway = gateway_with(ok_runner());
        let result = gateway.execute("ls", Some("APPROVE: ls"), SECOND).unwrap();
        assert!(result.allowed);
        assert!(result.approved);
    }

    #[test]
    fn timeout_is_reported_in_result() {
        let gateway = gateway_with(RecordingRunner {
            output: RunOutput {
                stdout: "partial".to_string(),
                exit_code: Some(137),
                timed_out: true,
                ..RunOutput::default()
            },
            ..RecordingRunner::default()
        });
        let result = gateway.execute("ls -R /", None, SECOND).unwrap();

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert!(result.allowed);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.stdout, "partial");
        assert_eq!(gateway.runner().calls().len(), 1);
    }

    #[test]
    fn nonzero_exit_is_not_an_error() {
        let gateway = gateway_with(RecordingRunner {
            output: RunOutput {
                stderr: "ls: cannot access 'nope'".to_string(),
                exit_code: Some(2),
                ..RunOutput::default()
            },
            ..RecordingRunner::default()
        });
        let result = gateway.execute("ls nope", None, SECOND).unwrap();

        assert_eq!(result.status, ExecutionStatus::Executed);
        assert_eq!(result.exit_code, Some(2));
        assert!(!result.succeeded());
    }

    #[test]
    fn runner_failure_propagates_as_error() {
        let gateway = gateway_with(RecordingRunner {
            fail: true,
            ..RecordingRunner::default()
        });

        match gateway.execute("ls", None, SECOND) {
            Err(ExecError::Spawn { .. }) => {}
            other => panic!("expected Spawn error, got {:?}", other),
        }
        assert_eq!(gateway.runner().calls().len(), 1);
    }

    #[test]
    fn blocked_command_never_reaches_failing_runner() {
        // A broken runner must not turn a block into an error.
        let gateway = gateway_with(RecordingRunner {
            fail: true,
            ..RecordingRunner::default()
        });
        let result = gateway.execute("rm -rf /", None, SECOND).unwrap();
        assert!(result.is_blocked());
    }

    #[test]
    fn evaluate_does_not_run() {
        let gateway = gateway_with(ok_runner());
        let decision = gateway.evaluate("git reset --hard", None);

        assert_eq!(decision.classification, Classification::Destructive);
        assert_eq!(decision.approval, ApprovalState::Absent);
        assert!(!decision.allowed);
        assert!(decision.block_reason.is_some());
        assert!(gateway.runner().calls().is_empty());
    }

    #[test]
    fn evaluate_allowed_has_no_reason() {
        let gateway = gateway_with(ok_runner());
        let decision = gateway.evaluate("mkdir out", None);
        assert!(decision.allowed);
        assert_eq!(decision.block_reason, None);
    }

    #[test]
    fn concurrent_calls_share_one_gateway() {
        let gateway = gateway_with(ok_runner());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    gateway.execute("ls", None, SECOND).unwrap();
                    gateway.execute("rm -rf /tmp/x", None, SECOND).unwrap();
                });
            }
        });
        // Only the eight read-only calls reached the runner.
        assert_eq!(gateway.runner().calls().len(), 8);
    }
}
