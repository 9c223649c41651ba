//! Process runner: one child process per poll tick.
//!
//! Renders the command template, runs it as a single shell command with
//! captured stdout/stderr, enforces the configured timeout, and classifies
//! the outcome. On timeout the child is killed and then waited on, so no
//! child process outlives its poll tick and the tick completes in roughly
//! the timeout rather than the child's runtime.

use crate::template::{TemplateVars, render_template};
use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// How often the wait loop checks whether the child has exited.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of one process execution.
///
/// Produced once per poll tick and consumed immediately by the output
/// interpreter; not retained across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    /// The command exited with code zero.
    Success {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit_code: i32,
    },

    /// The command exited with a non-zero code (or was terminated by a
    /// signal, reported as exit code -1).
    NonZeroExit {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit_code: i32,
    },

    /// The command ran past the configured timeout and was killed.
    Timeout {
        /// Wall-clock time from spawn until the kill completed.
        elapsed: Duration,
    },

    /// The command could not be started at all, including command-template
    /// rendering failures.
    SpawnFailure { error: String },
}

/// Execute a command template under a timeout.
///
/// The template is rendered against an *empty* variable set: the command may
/// embed configuration-time expressions (escaped braces, for instance) but
/// never runtime measurement variables, so any `{name}` reference fails the
/// render and is reported as a spawn failure.
///
/// Exactly one child process is created per call; no signal is sent unless
/// the timeout actually elapsed, and no retries are attempted.
pub fn run(command_template: &str, timeout: Duration) -> RawOutcome {
    let command = match render_template(command_template, &TemplateVars::new()) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!(template = command_template, "command template failed to render: {}", e);
            return RawOutcome::SpawnFailure {
                error: format!("failed to render command template: {}", e),
            };
        }
    };

    debug!(command = %command, timeout_seconds = timeout.as_secs(), "executing command");

    let mut child = match shell_command(&command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!(command = %command, "failed to spawn command: {}", e);
            return RawOutcome::SpawnFailure {
                error: format!("failed to spawn command '{}': {}", command, e),
            };
        }
    };

    // Drain both pipes on background threads so a chatty child can never
    // block on a full pipe buffer while we wait for it to exit.
    let stdout_reader = capture_stdout(&mut child);
    let stderr_reader = capture_stderr(&mut child);

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_and_reap(&mut child);
                    join_capture(stdout_reader);
                    join_capture(stderr_reader);
                    let elapsed = start.elapsed();
                    error!(
                        command = %command,
                        timeout_seconds = timeout.as_secs(),
                        "command timed out"
                    );
                    return RawOutcome::Timeout { elapsed };
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(e) => {
                kill_and_reap(&mut child);
                join_capture(stdout_reader);
                join_capture(stderr_reader);
                error!(command = %command, "failed to check process status: {}", e);
                return RawOutcome::SpawnFailure {
                    error: format!("failed to check process status: {}", e),
                };
            }
        }
    };

    let stdout = join_capture(stdout_reader);
    let stderr = join_capture(stderr_reader);

    // A signal-terminated child has no exit code; classify it as a failure.
    let exit_code = status.code().unwrap_or(-1);

    if exit_code == 0 {
        RawOutcome::Success {
            stdout,
            stderr,
            exit_code,
        }
    } else {
        error!(command = %command, exit_code, "command exited non-zero");
        RawOutcome::NonZeroExit {
            stdout,
            stderr,
            exit_code,
        }
    }
}

/// Build the platform shell invocation for a rendered command line.
#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Build the platform shell invocation for a rendered command line.
#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn capture_stdout(child: &mut Child) -> Option<JoinHandle<Vec<u8>>> {
    let pipe: ChildStdout = child.stdout.take()?;
    Some(spawn_reader(pipe))
}

fn capture_stderr(child: &mut Child) -> Option<JoinHandle<Vec<u8>>> {
    let pipe: ChildStderr = child.stderr.take()?;
    Some(spawn_reader(pipe))
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // Read errors end the capture; whatever was read so far is kept.
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Collect a capture thread's buffer. The pipes close when the child exits
/// (or is killed), so this join cannot hang.
fn join_capture(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Kill a child and wait for it to actually exit, so the runner never
/// returns while the operating-system process is still alive.
fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_success_captures_stdout() {
        let outcome = run("echo hello", Duration::from_secs(10));

        match outcome {
            RawOutcome::Success {
                stdout, exit_code, ..
            } => {
                assert_eq!(String::from_utf8_lossy(&stdout), "hello\n");
                assert_eq!(exit_code, 0);
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_multiline_stdout_preserved() {
        let outcome = run("printf 'line1\\nline2\\n'", Duration::from_secs(10));

        match outcome {
            RawOutcome::Success { stdout, .. } => {
                assert_eq!(String::from_utf8_lossy(&stdout), "line1\nline2\n");
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_nonzero_exit_captures_stderr() {
        let outcome = run("echo oops >&2; exit 3", Duration::from_secs(10));

        match outcome {
            RawOutcome::NonZeroExit {
                stderr, exit_code, ..
            } => {
                assert_eq!(String::from_utf8_lossy(&stderr), "oops\n");
                assert_eq!(exit_code, 3);
            }
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_shell_pipeline() {
        let outcome = run("echo hello world | tr a-z A-Z", Duration::from_secs(10));

        match outcome {
            RawOutcome::Success { stdout, .. } => {
                assert_eq!(String::from_utf8_lossy(&stdout), "HELLO WORLD\n");
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_timeout_kills_child_promptly() {
        let start = Instant::now();
        let outcome = run("sleep 5", Duration::from_secs(1));
        let wall = start.elapsed();

        match outcome {
            RawOutcome::Timeout { elapsed } => {
                assert!(elapsed >= Duration::from_secs(1));
                // Completes in roughly the timeout, not the child runtime.
                assert!(wall < Duration::from_secs(3), "took {:?}", wall);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_no_timeout_signal_when_fast() {
        // A fast command under a generous timeout must classify by exit code.
        let outcome = run("true", Duration::from_secs(10));
        assert!(matches!(outcome, RawOutcome::Success { .. }));
    }

    #[test]
    fn test_run_template_failure_is_spawn_failure() {
        let outcome = run("echo {undefined}", Duration::from_secs(10));

        match outcome {
            RawOutcome::SpawnFailure { error } => {
                assert!(error.contains("undefined variable 'undefined'"));
            }
            other => panic!("expected SpawnFailure, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_unknown_command_is_nonzero_exit() {
        // The shell itself spawns fine; the missing command is a shell-level
        // failure reported through the exit code (127).
        let outcome = run("nonexistent_command_xyz_123", Duration::from_secs(10));

        match outcome {
            RawOutcome::NonZeroExit { exit_code, .. } => {
                assert_eq!(exit_code, 127);
            }
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
    }

    #[test]
    #[cfg(not(windows))]
    fn test_run_large_output_does_not_deadlock() {
        // Output larger than any OS pipe buffer; the capture threads must
        // drain it while the wait loop polls.
        let outcome = run("head -c 1048576 /dev/zero", Duration::from_secs(10));

        match outcome {
            RawOutcome::Success { stdout, .. } => {
                assert_eq!(stdout.len(), 1_048_576);
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn test_run_escaped_braces_in_command() {
        let outcome = run("echo {{ok}}", Duration::from_secs(10));

        match outcome {
            RawOutcome::Success { stdout, .. } => {
                assert_eq!(String::from_utf8_lossy(&stdout).trim(), "{ok}");
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }
}
