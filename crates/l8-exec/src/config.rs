// config.rs — Gateway configuration.
//
// ExecConfig carries every command-category set and the temp-root list the
// classifier consults, so nothing is read from globals at classification
// time. It is loaded from `.liber8/exec.toml`; every field is optional and
// falls back to the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Configuration shared by the classifier, the gateway and the shell runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Inspection tools (list/print/show).
    #[serde(default = "default_read_only_commands")]
    pub read_only_commands: Vec<String>,

    /// Additive-only tools (create directory, create empty file).
    #[serde(default = "default_write_commands")]
    pub write_commands: Vec<String>,

    /// Tools that delete, format, shut down, stop services or uninstall.
    #[serde(default = "default_destructive_commands")]
    pub destructive_commands: Vec<String>,

    /// Tools that transfer data to or from another host.
    #[serde(default = "default_network_commands")]
    pub network_commands: Vec<String>,

    /// Package managers whose install subcommand reaches the network.
    #[serde(default = "default_package_managers")]
    pub package_managers: Vec<String>,

    /// Subcommands that make a package manager invocation a network one.
    #[serde(default = "default_install_subcommands")]
    pub install_subcommands: Vec<String>,

    /// Version-control tools checked for reset/clean/status/diff.
    #[serde(default = "default_vcs_commands")]
    pub vcs_commands: Vec<String>,

    /// Interpreters whose inline (`-c`) or test-module (`-m`) runs are read-only.
    #[serde(default = "default_interpreters")]
    pub interpreters: Vec<String>,

    /// Modules accepted after `-m` as a test run.
    #[serde(default = "default_test_modules")]
    pub test_modules: Vec<String>,

    /// Roots under which a fresh redirect target counts as scratch output.
    #[serde(default = "default_temp_roots")]
    pub temp_roots: Vec<PathBuf>,

    /// Directory commands run in and relative redirect targets resolve against.
    /// `None` means the current process directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Shell used to interpret allowed commands.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Timeout applied by `Gateway::execute_default`.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            read_only_commands: default_read_only_commands(),
            write_commands: default_write_commands(),
            destructive_commands: default_destructive_commands(),
            network_commands: default_network_commands(),
            package_managers: default_package_managers(),
            install_subcommands: default_install_subcommands(),
            vcs_commands: default_vcs_commands(),
            interpreters: default_interpreters(),
            test_modules: default_test_modules(),
            temp_roots: default_temp_roots(),
            working_dir: None,
            shell: default_shell(),
            default_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ExecConfig {
    /// Standard config file location for a project: `<root>/.liber8/exec.toml`.
    pub fn project_config_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(".liber8").join("exec.toml")
    }

    /// Load the project's config file (or defaults) and run commands from the project root.
    ///
    /// An explicit `working_dir` in the file wins over the project root.
    pub fn for_project(project_root: impl AsRef<Path>) -> Result<Self, ExecError> {
        let root = project_root.as_ref();
        let mut config = Self::load_or_default(&Self::project_config_path(root))?;
        if config.working_dir.is_none() {
            config.working_dir = Some(root.to_path_buf());
        }
        Ok(config)
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ExecError> {
        let content = std::fs::read_to_string(path).map_err(|source| ExecError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ExecError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config, returning defaults if the file doesn't exist.
    ///
    /// A file that exists but fails to parse is still an error; silently
    /// falling back would widen the policy without anyone noticing.
    pub fn load_or_default(path: &Path) -> Result<Self, ExecError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from TOML text. Command names are lower-cased.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// The timeout used when a caller does not supply one.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    // The classifier matches against a lower-cased copy of the command, so
    // the sets must be lower-case too.
    pub(crate) fn normalize(&mut self) {
        for set in [
            &mut self.read_only_commands,
            &mut self.write_commands,
            &mut self.destructive_commands,
            &mut self.network_commands,
            &mut self.package_managers,
            &mut self.install_subcommands,
            &mut self.vcs_commands,
            &mut self.interpreters,
            &mut self.test_modules,
        ] {
            for name in set.iter_mut() {
                *name = name.trim().to_lowercase();
            }
        }
    }
}

// Serde default functions
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_read_only_commands() -> Vec<String> {
    strings(&["ls", "dir", "cat", "type"])
}

fn default_write_commands() -> Vec<String> {
    strings(&["mkdir", "touch"])
}

fn default_destructive_commands() -> Vec<String> {
    strings(&[
        "rm",
        "del",
        "rmdir",
        "remove-item",
        "format",
        "diskpart",
        "shutdown",
        "reboot",
        "stop-service",
        "uninstall",
    ])
}

fn default_network_commands() -> Vec<String> {
    strings(&["curl", "wget", "invoke-webrequest"])
}

fn default_package_managers() -> Vec<String> {
    strings(&["pip", "pip3", "npm"])
}

fn default_install_subcommands() -> Vec<String> {
    strings(&["install"])
}

fn default_vcs_commands() -> Vec<String> {
    strings(&["git"])
}

fn default_interpreters() -> Vec<String> {
    strings(&["python", "python3"])
}

fn default_test_modules() -> Vec<String> {
    strings(&["unittest"])
}

/// `/tmp`, `/var/tmp`, plus `$TMPDIR` when it is set and not already listed.
fn default_temp_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("/tmp"), PathBuf::from("/var/tmp")];
    if let Some(tmpdir) = std::env::var_os("TMPDIR") {
        let tmpdir = PathBuf::from(tmpdir);
        if !tmpdir.as_os_str().is_empty() && !roots.contains(&tmpdir) {
            roots.push(tmpdir);
        }
    }
    roots
}

fn default_shell() -> String {
    if cfg!(windows) {
        "cmd".to_string()
    } else {
        "sh".to_string()
    }
}

fn default_timeout_secs() -> u64 {
    10
}
