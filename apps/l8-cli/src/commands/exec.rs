// exec.rs — `l8 exec`: run one command through the gateway and audit it.
//
// Exit codes: 0 ran and exited 0, 1 ran and exited non-zero, 2 blocked,
// 124 timed out (the coreutils `timeout` convention).

use std::time::Duration;

use clap::Args;
use l8_audit::{AuditAction, AuditEvent, AuditLog};
use l8_exec::{ExecutionResult, ExecutionStatus, Gateway};

pub const EXIT_BLOCKED: i32 = 2;
pub const EXIT_TIMED_OUT: i32 = 124;

#[derive(Args)]
pub struct ExecArgs {
    /// The shell command, quoted as one argument.
    pub command: String,
    /// Approval token of the form `APPROVE:<command>`.
    #[arg(long)]
    pub approve: Option<String>,
    /// Timeout in seconds (defaults to the config's `default_timeout_secs`).
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Print the full result as JSON instead of the command's output.
    #[arg(long)]
    pub json: bool,
    /// Don't append an event to the audit log.
    #[arg(long)]
    pub no_audit: bool,
    /// Who is submitting the command, recorded in the audit log.
    #[arg(long, default_value = "cli")]
    pub actor: String,
}

pub fn execute(ctx: &super::Context, args: &ExecArgs) -> anyhow::Result<i32> {
    let config = ctx.exec_config()?;
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.default_timeout());
    let gateway = Gateway::new(config);

    let mut audit = if args.no_audit {
        None
    } else {
        Some(AuditLog::open(ctx.audit_log())?)
    };

    let result = match gateway.execute(&args.command, args.approve.as_deref(), timeout) {
        Ok(result) => result,
        Err(e) => {
            if let Some(log) = audit.as_mut() {
                let mut event =
                    AuditEvent::new(&args.actor, AuditAction::RunnerFailed, &args.command)
                        .with_metadata(serde_json::json!({ "error": e.to_string() }));
                log.append(&mut event)?;
                tracing::info!(event_id = %event.event_id, "runner failure recorded in audit log");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        actor = %args.actor,
        classification = %result.classification,
        status = result.status.as_str(),
        "gateway decision"
    );

    if let Some(log) = audit.as_mut() {
        let mut event = audit_event(&args.actor, &result)?;
        log.append(&mut event)?;
        tracing::info!(
            event_id = %event.event_id,
            path = %log.path().display(),
            "audit event recorded"
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
        if result.is_blocked() {
            eprintln!();
        }
    }

    Ok(exit_code(&result))
}

/// Build the audit record for a gateway result, embedding the result itself.
pub fn audit_event(actor: &str, result: &ExecutionResult) -> anyhow::Result<AuditEvent> {
    let action = match result.status {
        ExecutionStatus::Blocked => AuditAction::CommandBlocked,
        ExecutionStatus::Executed => AuditAction::CommandExecuted,
        ExecutionStatus::TimedOut => AuditAction::CommandTimedOut,
    };
    let mut event = AuditEvent::new(actor, action, &result.command)
        .with_metadata(serde_json::to_value(result)?);
    if !result.is_blocked() {
        event = event.with_output(&result.stdout, &result.stderr);
    }
    Ok(event)
}

pub fn exit_code(result: &ExecutionResult) -> i32 {
    match result.status {
        ExecutionStatus::Blocked => EXIT_BLOCKED,
        ExecutionStatus::TimedOut => EXIT_TIMED_OUT,
        ExecutionStatus::Executed if result.exit_code == Some(0) => 0,
        ExecutionStatus::Executed => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l8_exec::Classification;

    fn result(status: ExecutionStatus, exit_code: Option<i32>) -> ExecutionResult {
        ExecutionResult {
            command: "make test".to_string(),
            classification: Classification::ReadOnly,
            approved: false,
            allowed: status != ExecutionStatus::Blocked,
            status,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            exit_code,
            duration: Duration::from_millis(20),
        }
    }

    #[test]
    fn exit_codes_follow_status() {
        assert_eq!(exit_code(&result(ExecutionStatus::Executed, Some(0))), 0);
        assert_eq!(exit_code(&result(ExecutionStatus::Executed, Some(3))), 1);
        assert_eq!(exit_code(&result(ExecutionStatus::Executed, None)), 1);
        assert_eq!(exit_code(&result(ExecutionStatus::Blocked, None)), EXIT_BLOCKED);
        assert_eq!(
            exit_code(&result(ExecutionStatus::TimedOut, None)),
            EXIT_TIMED_OUT
        );
    }

    #[test]
    fn executed_event_hashes_output_and_embeds_result() {
        let event = audit_event("agent-7", &result(ExecutionStatus::Executed, Some(0))).unwrap();
        assert_eq!(event.action, AuditAction::CommandExecuted);
        assert_eq!(event.actor, "agent-7");
        assert_eq!(event.command, "make test");
        assert!(event.output_hash.is_some());
        assert_eq!(event.metadata["status"], "executed");
        assert_eq!(event.metadata["classification"], "read_only");
    }

    #[test]
    fn blocked_event_has_no_output_hash() {
        let event = audit_event("cli", &result(ExecutionStatus::Blocked, None)).unwrap();
        assert_eq!(event.action, AuditAction::CommandBlocked);
        assert!(event.output_hash.is_none());
        assert!(event.metadata["exit_code"].is_null());
    }

    #[test]
    fn timed_out_maps_to_timed_out_action() {
        let event = audit_event("cli", &result(ExecutionStatus::TimedOut, None)).unwrap();
        assert_eq!(event.action, AuditAction::CommandTimedOut);
    }
}
