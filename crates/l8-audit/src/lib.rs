//! # l8-audit
//!
//! Append-only decision log for the Liber8 command gateway.
//!
//! Every gateway call (blocked, executed, timed out, or failed in the runner)
//! is recorded as an [`AuditEvent`] in a JSONL (JSON Lines) log file. Each
//! event carries SHA-256 hashes of the command and its captured output, and
//! links to the previous line's hash so that any edit to the log is
//! detectable.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use l8_audit::{AuditAction, AuditEvent, AuditLog};
//!
//! let mut log = AuditLog::open("/tmp/audit.jsonl").unwrap();
//! let mut event = AuditEvent::new("agent-1", AuditAction::CommandBlocked, "rm -rf build");
//! log.append(&mut event).unwrap();
//! ```

// Module declarations — each `mod foo;` tells Rust to look for `foo.rs`
// in the same directory and include it as a submodule.
pub mod error;
pub mod event;
pub mod hasher;
pub mod log;

// Re-export the main types at the crate root for convenience.
pub use error::AuditError;
pub use event::{AuditAction, AuditEvent};
pub use log::AuditLog;
