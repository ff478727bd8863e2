// redirect.rs — Filesystem probes for `>` redirect targets.
//
// A lone `>` truncates its target. Whether that is harmless depends on the
// target: a fresh file under a temp root is scratch output, an existing file
// anywhere else is an overwrite. The probe happens at classification time,
// so a file created or removed between classification and execution is not
// seen (known TOCTOU gap; the classifier is advisory).

use std::io;
use std::path::{Path, PathBuf};

use crate::shell::Redirect;

/// Redirect sinks that discard output and never count as a target.
const DISCARD_SINKS: &[&str] = &["/dev/null"];

/// Characters that make the shell rewrite a target word before opening it.
const EXPANSION_CHARS: &[char] = &['$', '`', '*', '?', '['];

/// Outcome of probing every redirect target of one sub-command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RedirectAnalysis {
    /// Some target already exists outside every temp root, or the redirect
    /// has no target at all, or the target needs shell expansion.
    pub overwrite: bool,
    /// Some target does not exist yet and lies under a temp root.
    pub safe: bool,
}

/// What the probe learned about one target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetProbe {
    Resolved { exists: bool, in_temp_root: bool },
    /// Existence or resolution failed with an I/O error. Counts as neither
    /// overwrite nor safe.
    Unresolvable,
}

/// Probes redirect targets against a fixed set of temp roots.
#[derive(Debug, Clone)]
pub(crate) struct RedirectProbe {
    temp_roots: Vec<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl RedirectProbe {
    /// Temp roots are kept both as written and canonicalized, so `/tmp`
    /// still matches on systems where it is a symlink.
    pub fn new(temp_roots: &[PathBuf], working_dir: Option<PathBuf>) -> Self {
        let mut roots = Vec::new();
        for root in temp_roots {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
            if let Ok(canonical) = std::fs::canonicalize(root) {
                if !roots.contains(&canonical) {
                    roots.push(canonical);
                }
            }
        }
        Self {
            temp_roots: roots,
            working_dir,
        }
    }

    pub fn analyze(&self, redirects: &[Redirect]) -> RedirectAnalysis {
        let mut analysis = RedirectAnalysis::default();
        for redirect in redirects {
            let target = match redirect {
                Redirect::Missing => {
                    analysis.overwrite = true;
                    continue;
                }
                Redirect::Target(target) => target,
            };
            if DISCARD_SINKS.contains(&target.as_str()) {
                continue;
            }
            if needs_expansion(target) {
                // `~`, `$VAR` and globs name a file only the shell knows.
                analysis.overwrite = true;
                continue;
            }
            match self.probe(Path::new(target)) {
                TargetProbe::Resolved {
                    exists,
                    in_temp_root,
                } => {
                    if exists && !in_temp_root {
                        analysis.overwrite = true;
                    }
                    if !exists && in_temp_root {
                        analysis.safe = true;
                    }
                }
                TargetProbe::Unresolvable => {
                    tracing::debug!("redirect target '{}' could not be resolved", target);
                }
            }
        }
        analysis
    }

    fn probe(&self, target: &Path) -> TargetProbe {
        let result = self.absolutize(target).and_then(|path| {
            let exists = path.try_exists()?;
            let resolved = resolve(&path)?;
            Ok((exists, resolved))
        });
        match result {
            Ok((exists, resolved)) => TargetProbe::Resolved {
                exists,
                in_temp_root: self.temp_roots.iter().any(|root| resolved.starts_with(root)),
            },
            Err(_) => TargetProbe::Unresolvable,
        }
    }

    fn absolutize(&self, target: &Path) -> io::Result<PathBuf> {
        if target.is_absolute() {
            return Ok(target.to_path_buf());
        }
        let base = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(base.join(target))
    }
}

fn needs_expansion(target: &str) -> bool {
    target.starts_with('~') || target.contains(EXPANSION_CHARS)
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// rest, so symlinks and `..` in the existing part are resolved even when
/// the file itself does not exist yet.
///
/// A `..` in the non-existent tail cannot be resolved and is an error.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        match std::fs::canonicalize(existing) {
            Ok(mut resolved) => {
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("cannot resolve '{}'", path.display()),
                    ));
                };
                tail.push(name);
                existing = parent;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn target(path: &Path) -> Redirect {
        Redirect::Target(path.to_string_lossy().into_owned())
    }

    #[test]
    fn new_file_under_temp_root_is_safe() {
        let scratch = tempdir().unwrap();
        let probe = RedirectProbe::new(&[scratch.path().to_path_buf()], None);

        let analysis = probe.analyze(&[target(&scratch.path().join("new.txt"))]);
        assert_eq!(
            analysis,
            RedirectAnalysis {
                overwrite: false,
                safe: true
            }
        );
    }

    #[test]
    fn new_file_in_missing_subdir_of_temp_root_is_safe() {
        let scratch = tempdir().unwrap();
        let probe = RedirectProbe::new(&[scratch.path().to_path_buf()], None);

        let analysis = probe.analyze(&[target(&scratch.path().join("a/b/new.txt"))]);
        assert!(analysis.safe);
    }

    #[test]
    fn existing_file_outside_temp_root_is_overwrite() {
        let scratch = tempdir().unwrap();
        let project = tempdir().unwrap();
        std::fs::write(project.path().join("existing.txt"), "keep me").unwrap();
        let probe = RedirectProbe::new(
            &[scratch.path().to_path_buf()],
            Some(project.path().to_path_buf()),
        );

        let analysis = probe.analyze(&[Redirect::Target("./existing.txt".to_string())]);
        assert!(analysis.overwrite);
        assert!(!analysis.safe);
    }

    #[test]
    fn existing_file_under_temp_root_is_neither() {
        let scratch = tempdir().unwrap();
        std::fs::write(scratch.path().join("old.txt"), "x").unwrap();
        let probe = RedirectProbe::new(&[scratch.path().to_path_buf()], None);

        let analysis = probe.analyze(&[target(&scratch.path().join("old.txt"))]);
        assert_eq!(analysis, RedirectAnalysis::default());
    }

    #[test]
    fn dotdot_escape_from_temp_root_is_not_safe() {
        let scratch = tempdir().unwrap();
        std::fs::create_dir(scratch.path().join("inner")).unwrap();
        let probe = RedirectProbe::new(&[scratch.path().join("inner")], None);

        let escaped = scratch.path().join("inner/../outside.txt");
        let analysis = probe.analyze(&[target(&escaped)]);
        assert!(!analysis.safe);
    }

    #[test]
    fn missing_target_is_overwrite() {
        let probe = RedirectProbe::new(&[], None);
        assert!(probe.analyze(&[Redirect::Missing]).overwrite);
    }

    #[test]
    fn dev_null_is_ignored() {
        let probe = RedirectProbe::new(&[], None);
        let analysis = probe.analyze(&[Redirect::Target("/dev/null".to_string())]);
        assert_eq!(analysis, RedirectAnalysis::default());
    }

    #[test]
    fn unresolvable_target_is_neither() {
        let scratch = tempdir().unwrap();
        let probe = RedirectProbe::new(&[scratch.path().to_path_buf()], None);

        // An interior NUL byte makes every filesystem call fail.
        let bad = format!("{}/bad\0name", scratch.path().display());
        let analysis = probe.analyze(&[Redirect::Target(bad)]);
        assert_eq!(analysis, RedirectAnalysis::default());
    }

    #[test]
    fn targets_needing_expansion_are_overwrite() {
        let scratch = tempdir().unwrap();
        let probe = RedirectProbe::new(&[scratch.path().to_path_buf()], None);

        for word in ["~/.bashrc", "$HOME/.profile", "${HOME}/x", "*.rs", "out?.txt"] {
            let analysis = probe.analyze(&[Redirect::Target(word.to_string())]);
            assert!(analysis.overwrite, "{} should count as overwrite", word);
        }
        // Even when it would land under a temp root.
        let tmp_var = format!("{}/$name", scratch.path().display());
        assert!(probe.analyze(&[Redirect::Target(tmp_var)]).overwrite);
    }
}
