// error.rs — Error types for the execution gateway.
//
// Policy blocks are NOT errors: a blocked command is a normal, successful
// `ExecutionResult`. This enum is reserved for infrastructure faults (the
// shell could not be spawned, the child could not be waited on) and for
// configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading configuration or running a command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The shell process could not be started (e.g., the shell is missing).
    #[error("failed to spawn shell '{shell}': {source}")]
    Spawn {
        shell: String,
        source: std::io::Error,
    },

    /// The child process was started but could not be waited on or killed.
    #[error("failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),

    /// Failed to read the configuration file.
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for `ExecConfig`.
    #[error("invalid config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
