// classifier.rs — Risk classification of shell command strings.
//
// `Classifier::classify()` maps a command string to one of four categories.
// Each sub-command (split at `;`, `&&`, `||`, `|`, `&`) is run through an
// ordered list of checks, first match wins:
//
// 1. Network     — transfer tools, package-manager installs
// 2. Destructive — delete/format/shutdown tools, `git reset --hard`,
//                  forced `git clean`, `>` onto an existing non-temp file
// 3. Read-only   — inspection tools, `git status/diff`, `python -c`,
//                  `python -m unittest`
// 4. Write       — mkdir/touch, `>` onto a fresh file under a temp root
// 5. Otherwise   — Destructive (fail closed)
//
// The whole command takes the riskiest category of any sub-command, so
// `ls && rm -rf x` is destructive. Commands substituted into a sub-command
// (`$(...)`, backticks, `<(...)`) are classified the same way and count as
// sub-commands, so `ls $(rm -rf x)` is destructive too.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ExecConfig;
use crate::redirect::RedirectProbe;
use crate::shell;

/// Risk category of a command. Variants are listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Reaches outside the local host (downloads, package installs).
    Network,
    /// Can irreversibly delete, overwrite or disable state.
    Destructive,
    /// Only observes state.
    ReadOnly,
    /// Creates new state without touching existing state.
    WriteNonDestructive,
}

impl Classification {
    /// Whether a command in this category needs a matching approval to run.
    pub fn requires_approval(self) -> bool {
        matches!(self, Classification::Network | Classification::Destructive)
    }

    /// Ordering used to combine sub-commands: higher is riskier.
    pub fn risk_rank(self) -> u8 {
        match self {
            Classification::ReadOnly => 0,
            Classification::WriteNonDestructive => 1,
            Classification::Destructive => 2,
            Classification::Network => 3,
        }
    }

    /// The snake_case name used in results and audit records.
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Network => "network",
            Classification::Destructive => "destructive",
            Classification::ReadOnly => "read_only",
            Classification::WriteNonDestructive => "write_non_destructive",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies command strings against an [`ExecConfig`].
///
/// Holds no mutable state; one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ExecConfig,
    redirects: RedirectProbe,
}

impl Classifier {
    /// Command names in `config` are lower-cased here, so a config built in
    /// code matches the same way as one loaded from TOML.
    pub fn new(mut config: ExecConfig) -> Self {
        config.normalize();
        let redirects = RedirectProbe::new(&config.temp_roots, config.working_dir.clone());
        Self { config, redirects }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Classify a command. Never fails: empty or unparsable input is
    /// `Destructive`.
    pub fn classify(&self, command: &str) -> Classification {
        let classification = self.classify_command(command);
        tracing::debug!(command = command.trim(), %classification, "classified command");
        classification
    }

    fn classify_command(&self, command: &str) -> Classification {
        let cleaned = command.trim();
        if cleaned.is_empty() {
            return Classification::Destructive;
        }

        shell::split_segments(cleaned)
            .into_iter()
            .map(|segment| self.classify_with_substitutions(segment))
            .max_by_key(|c| c.risk_rank())
            .unwrap_or(Classification::Destructive)
    }

    // A sub-command is as risky as the worst command substituted into it.
    fn classify_with_substitutions(&self, segment: &str) -> Classification {
        shell::substitutions(segment)
            .iter()
            .map(|body| self.classify_command(body))
            .fold(self.classify_segment(segment), |worst, nested| {
                if nested.risk_rank() > worst.risk_rank() {
                    nested
                } else {
                    worst
                }
            })
    }

    fn classify_segment(&self, segment: &str) -> Classification {
        // Keyword matching is case-insensitive; redirect targets keep their
        // original case because the filesystem may not be.
        let lower = segment.to_lowercase();
        let tokens = shell::tokenize(&lower);
        let Some(first) = tokens.first() else {
            return Classification::Destructive;
        };
        let base = base_name(first);
        let args = &tokens[1..];

        if self.is_network(base, args) {
            return Classification::Network;
        }

        let redirects = self.redirects.analyze(&shell::redirect_targets(segment));

        if self.is_destructive(base, args) || redirects.overwrite {
            return Classification::Destructive;
        }
        if self.is_read_only(base, args) {
            return Classification::ReadOnly;
        }
        if contains(&self.config.write_commands, base) || redirects.safe {
            return Classification::WriteNonDestructive;
        }
        Classification::Destructive
    }

    fn is_network(&self, base: &str, args: &[String]) -> bool {
        if contains(&self.config.network_commands, base) {
            return true;
        }
        contains(&self.config.package_managers, base)
            && args
                .iter()
                .any(|arg| contains(&self.config.install_subcommands, arg))
    }

    fn is_destructive(&self, base: &str, args: &[String]) -> bool {
        if contains(&self.config.destructive_commands, base) {
            return true;
        }
        if contains(&self.config.vcs_commands, base) {
            if has(args, "reset") && has(args, "--hard") {
                return true;
            }
            if has(args, "clean") && args.iter().any(|arg| is_force_flag(arg)) {
                return true;
            }
        }
        false
    }

    fn is_read_only(&self, base: &str, args: &[String]) -> bool {
        if contains(&self.config.read_only_commands, base) {
            return true;
        }
        if contains(&self.config.vcs_commands, base) {
            return match vcs_subcommand(args) {
                Some(("status", _)) => true,
                Some(("diff", rest)) => !rest.iter().any(|arg| arg.starts_with("--output")),
                _ => false,
            };
        }
        if contains(&self.config.interpreters, base) {
            return self.is_inline_or_test_run(args);
        }
        false
    }

    /// `-c <code>` or `-m <test module>` given before any script path.
    fn is_inline_or_test_run(&self, args: &[String]) -> bool {
        for (i, arg) in args.iter().enumerate() {
            match arg.as_str() {
                "-c" => return true,
                "-m" => {
                    return args
                        .get(i + 1)
                        .is_some_and(|module| contains(&self.config.test_modules, module));
                }
                // Script from stdin or end of options.
                "-" | "--" => return false,
                // Interpreter options such as `-u` or `-B`.
                a if a.starts_with('-') => continue,
                // A script path: everything after it belongs to the script.
                _ => return false,
            }
        }
        false
    }
}

/// Program name without its directory (`/usr/bin/rm` → `rm`).
fn base_name(program: &str) -> &str {
    program
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(program)
}

/// The VCS subcommand and its arguments, skipping global options.
///
/// Args are lower-cased, so `-C <dir>` and `-c <key=value>` look alike: a
/// value with `=` is a config override and makes the result `None`, since
/// config can point a read-only subcommand at an arbitrary program
/// (`core.fsmonitor`, `core.pager`). Anything else is a directory.
fn vcs_subcommand(args: &[String]) -> Option<(&str, &[String])> {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                if args.get(i + 1).map_or(true, |value| value.contains('=')) {
                    return None;
                }
                i += 2;
            }
            a if a.starts_with("-c") => return None,
            a if a.starts_with('-') => i += 1,
            subcommand => return Some((subcommand, &args[i + 1..])),
        }
    }
    None
}

fn contains(set: &[String], name: &str) -> bool {
    set.iter().any(|item| item == name)
}

fn has(args: &[String], word: &str) -> bool {
    args.iter().any(|arg| arg == word)
}

/// `--force`, or a short-flag cluster containing `f` (`-f`, `-fdx`, `-xf`).
fn is_force_flag(arg: &str) -> bool {
    if arg == "--force" {
        return true;
    }
    arg.len() > 1 && arg.starts_with('-') && !arg.starts_with("--") && arg.contains('f')
}
