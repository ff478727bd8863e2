// runner.rs — Bounded process execution.
//
// The gateway never spawns processes itself; it hands allowed commands to a
// `CommandRunner`. `ShellRunner` is the real one: it runs the command through
// the configured shell, captures stdout and stderr, and kills the child if it
// outlives the timeout.
//
// Output pipes are drained on their own threads while the main thread polls
// for exit. Reading only after exit would deadlock any child that fills a
// pipe buffer. On Unix the child leads its own process group and a timeout
// kills the whole group. The deadline also bounds the wait for the pipes to
// close: a background job (`sleep 60 &`) keeps them open after the shell
// exits, and that counts as a timeout too.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ExecConfig;
use crate::error::ExecError;

/// How often `ShellRunner` checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to keep reading after a kill, for output already in flight.
const KILL_GRACE: Duration = Duration::from_millis(100);

/// Captured result of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when killed by a signal or on timeout.
    pub exit_code: Option<i32>,
    /// The child was killed because it exceeded the timeout.
    pub timed_out: bool,
}

/// Runs a shell command string with a hard timeout.
///
/// Implementations must return `Err` only when the command could not be
/// run at all. A non-zero exit or a timeout is a normal `RunOutput`.
pub trait CommandRunner {
    fn run(&self, command: &str, timeout: Duration) -> Result<RunOutput, ExecError>;
}

/// Runs commands through `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    working_dir: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
        }
    }

    pub fn from_config(config: &ExecConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    /// Run commands in `dir` instead of the current process directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        if cfg!(windows) {
            cmd.arg("/C");
        } else {
            cmd.arg("-c");
        }
        cmd.arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::from_config(&ExecConfig::default())
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, timeout: Duration) -> Result<RunOutput, ExecError> {
        let mut child = self
            .command(command)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                shell: self.shell.clone(),
                source,
            })?;

        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        // A timeout too large to represent as an Instant means no deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut timed_out = false;
        let exit_code = loop {
            match child.try_wait().map_err(ExecError::Wait)? {
                Some(status) => break status.code(),
                None if is_past(deadline) => {
                    kill(&mut child)?;
                    timed_out = true;
                    break None;
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        if !timed_out && !(stdout.wait_until(deadline) && stderr.wait_until(deadline)) {
            tracing::debug!(command, "pipes still open at deadline, killing process group");
            kill_group(&mut child).map_err(ExecError::Wait)?;
            timed_out = true;
        }
        if timed_out {
            let grace = Instant::now().checked_add(KILL_GRACE);
            stdout.wait_until(grace);
            stderr.wait_until(grace);
        }

        Ok(RunOutput {
            stdout: stdout.text(),
            stderr: stderr.text(),
            exit_code: if timed_out { None } else { exit_code },
            timed_out,
        })
    }
}

fn is_past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn kill(child: &mut Child) -> Result<(), ExecError> {
    kill_group(child).map_err(ExecError::Wait)?;
    child.wait().map_err(ExecError::Wait)?;
    Ok(())
}

#[cfg(unix)]
fn kill_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group the child was placed in at spawn.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == -1 {
        let e = io::Error::last_os_error();
        // ESRCH: every process in the group has already exited.
        if e.raw_os_error() != Some(libc::ESRCH) {
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        // Already exited between try_wait and kill.
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

/// Output of one pipe, read on a background thread.
///
/// The reader is detached rather than joined; if something outside the
/// process group still holds the pipe, the thread ends when that does.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Option<Receiver<()>>,
}

impl Capture {
    fn start<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let Some(mut pipe) = pipe else {
            return Self { buf, done: None };
        };
        let (tx, rx) = mpsc::channel();
        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    // A read error just truncates the captured output.
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
        Self { buf, done: Some(rx) }
    }

    /// Wait for end of stream until `deadline` (`None` waits indefinitely).
    /// Returns whether the stream has closed.
    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let Some(done) = &self.done else {
            return true;
        };
        let outcome = match deadline {
            None => done.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                done.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
        };
        !matches!(outcome, Err(RecvTimeoutError::Timeout))
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&lock(&self.buf)).into_owned()
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn run(command: &str) -> RunOutput {
        ShellRunner::new("sh")
            .run(command, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn captures_stdout_stderr_and_exit_code() {
        let output = run("echo out; echo err >&2; exit 3");
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.timed_out);
    }

    #[test]
    fn large_output_does_not_deadlock() {
        let output = run("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done");
        assert_eq!(output.stdout.len(), 20000 * 11);
        assert_eq!(output.exit_code, Some(0));
    }

    #[test]
    fn timeout_kills_the_child() {
        let start = Instant::now();
        let output = ShellRunner::new("sh")
            .run("sleep 5", Duration::from_millis(200))
            .unwrap();
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = ShellRunner::new("sh")
            .with_working_dir(dir.path())
            .run("pwd -P", Duration::from_secs(5))
            .unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(output.stdout.trim(), expected.to_string_lossy());
    }

    #[test]
    fn missing_shell_is_a_spawn_error() {
        let err = ShellRunner::new("/nonexistent/shell")
            .run("true", Duration::from_secs(1))
            .unwrap_err();
        match err {
            ExecError::Spawn { shell, .. } => assert_eq!(shell, "/nonexistent/shell"),
            other => panic!("expected Spawn, got {:?}", other),
        }
    }

    #[test]
    fn background_job_is_bounded_by_timeout() {
        let start = Instant::now();
        let output = ShellRunner::new("sh")
            .run("sleep 3 & echo hi", Duration::from_millis(300))
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert_eq!(output.stdout, "hi\n");
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let output = ShellRunner::new("sh")
            .run("echo ok", Duration::MAX)
            .unwrap();
        assert!(!output.timed_out);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "ok\n");
    }
}
