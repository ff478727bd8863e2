// audit.rs — Audit subcommands: verify, tail.

use std::path::PathBuf;

use clap::Subcommand;
use l8_audit::{AuditError, AuditLog};

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain integrity.
    Verify {
        /// Path to audit log (defaults to .liber8/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Show recent audit events.
    Tail {
        /// Path to audit log (defaults to .liber8/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, ctx: &super::Context) -> anyhow::Result<i32> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log.clone().unwrap_or_else(|| ctx.audit_log());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(0);
            }

            match AuditLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Audit log verified: {} event(s), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The audit log may have been tampered with.");
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let path = log.clone().unwrap_or_else(|| ctx.audit_log());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(0);
            }

            let recent = AuditLog::tail(&path, *n)?;
            if recent.is_empty() {
                println!("No audit events.");
                return Ok(0);
            }

            println!(
                "{:<20} {:<10} {:<18} {:<10} COMMAND",
                "TIMESTAMP", "ACTOR", "ACTION", "CLASS"
            );
            println!("{}", "-".repeat(80));

            for event in recent {
                let classification = event.metadata["classification"].as_str().unwrap_or("-");
                println!(
                    "{:<20} {:<10} {:<18} {:<10} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.actor,
                    event.action.as_str(),
                    classification,
                    event.command,
                );
            }
        }
    }

    Ok(0)
}
