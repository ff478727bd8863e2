//! # l8-exec
//!
//! Command safety gateway for Liber8.
//!
//! An agent hands the [`Gateway`] a shell command string. The [`Classifier`]
//! sorts it into one of four risk categories, the gateway checks any
//! approval token against the exact command text, and only then is the
//! command run through a bounded [`CommandRunner`]. Every call returns an
//! [`ExecutionResult`] suitable for embedding in an audit record.
//!
//! ## Key invariants
//!
//! - **Fail closed**: empty, unparsable or unrecognized commands classify
//!   as `destructive`.
//! - **Worst case wins**: `ls && rm -rf x` and `ls $(rm -rf x)` are as risky
//!   as `rm -rf x`.
//! - **Content-bound approval**: `APPROVE:<command>` authorizes that exact
//!   command (modulo whitespace) and nothing else.
//! - **Blocks are results, not errors**: only runner faults return `Err`.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use l8_exec::{ExecConfig, ExecutionStatus, Gateway};
//!
//! let gateway = Gateway::new(ExecConfig::default());
//! let result = gateway.execute("rm -rf build", None, Duration::from_secs(5)).unwrap();
//! assert_eq!(result.status, ExecutionStatus::Blocked);
//!
//! let approved = gateway
//!     .execute("rm -rf build", Some("APPROVE: rm -rf build"), Duration::from_secs(5))
//!     .unwrap();
//! assert!(approved.allowed);
//! ```

pub mod approval;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;
mod redirect;
pub mod result;
pub mod runner;
mod shell;

pub use approval::{normalize_command, ApprovalCredential, ApprovalState, APPROVAL_PREFIX};
pub use classifier::{Classification, Classifier};
pub use config::ExecConfig;
pub use error::ExecError;
pub use gateway::{Decision, Gateway};
pub use result::{ExecutionResult, ExecutionStatus};
pub use runner::{CommandRunner, RunOutput, ShellRunner};
