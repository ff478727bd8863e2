// Subcommand implementations. Each `execute` returns the process exit code.

pub mod audit;
pub mod classify;
pub mod exec;

use std::path::PathBuf;

use l8_exec::ExecConfig;

/// Paths shared by every subcommand.
pub struct Context {
    pub project_root: PathBuf,
    config_path: Option<PathBuf>,
}

impl Context {
    pub fn new(project_root: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self {
            project_root,
            config_path,
        }
    }

    /// Default audit log location: `<root>/.liber8/audit.jsonl`.
    pub fn audit_log(&self) -> PathBuf {
        self.project_root.join(".liber8").join("audit.jsonl")
    }

    /// Load the gateway config. An explicit `--config` must exist; the
    /// project default may be absent.
    pub fn exec_config(&self) -> anyhow::Result<ExecConfig> {
        match &self.config_path {
            Some(path) => {
                let mut config = ExecConfig::load(path)?;
                if config.working_dir.is_none() {
                    config.working_dir = Some(self.project_root.clone());
                }
                Ok(config)
            }
            None => Ok(ExecConfig::for_project(&self.project_root)?),
        }
    }
}
