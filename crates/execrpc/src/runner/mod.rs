//! Plugin execution.
//!
//! A [`Runner`] executes a single plugin invocation described by a
//! [`RunEnv`]. The production implementation is [`ExecRunner`], which spawns
//! the plugin as a child process with a cleared environment and pipes the
//! stdio slots. [`ServerRunner`] dispatches to a [`Server`] in-process and
//! exists primarily for tests, where it exercises the full wire protocol
//! without a process boundary.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, ExitError};
use crate::server::Server;

/// Tracing target for runner operations.
const RUNNER_TARGET: &str = "execrpc::runner";

/// The only variable a plugin process inherits. Plugins must not rely on
/// the spawning environment.
const EMPTY_ENV_KEY: &str = "__EMPTY_ENV";

/// How often a timed runner polls for child exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Process environment for a single plugin invocation.
///
/// Missing stdio slots are substituted with an empty source or a discarding
/// sink, so a plugin can always read stdin to EOF and write stdout freely.
pub struct RunEnv<'a> {
    /// Arguments passed to the plugin, without the program name.
    pub args: Vec<String>,
    /// Source of the request body, if any.
    pub stdin: Option<&'a mut (dyn Read + Send)>,
    /// Sink for the response body, if captured.
    pub stdout: Option<&'a mut (dyn Write + Send)>,
    /// Sink for plugin diagnostics, if forwarded.
    pub stderr: Option<&'a mut (dyn Write + Send)>,
}

/// Executes a single plugin invocation.
///
/// Runners never proxy environment variables to the commands they run.
pub trait Runner {
    /// Runs the plugin with the given environment.
    ///
    /// # Errors
    ///
    /// A non-zero process exit is reported as [`Error::Exit`] carrying the
    /// exact exit code of the child.
    fn run(&self, env: RunEnv<'_>) -> Result<(), Error>;
}

/// Runner that spawns the plugin as a child process.
///
/// The program may be prefixed with base args when the plugin lives under a
/// sub-command: with base args `["foo", "bar"]` on program `plug`, the
/// invocation `plug foo bar --spec` produces the spec.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use execrpc::ExecRunner;
///
/// let runner = ExecRunner::new("echo-plugin").with_timeout(Duration::from_secs(30));
/// ```
pub struct ExecRunner {
    program: String,
    base_args: Vec<String>,
    timeout: Option<Duration>,
}

impl ExecRunner {
    /// Creates a runner for the given program name.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout: None,
        }
    }

    /// Prefixes every invocation with the given sub-command args.
    #[must_use]
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    /// Kills the plugin if it has not exited within the given duration.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn wait_for_exit(&self, child: &mut Child) -> Result<ExitStatus, Error> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|err| Error::Io {
                context: "waiting for plugin exit",
                source: Arc::new(err),
            });
        };
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() > timeout {
                        warn!(
                            target: RUNNER_TARGET,
                            program = %self.program,
                            timeout_secs = timeout.as_secs(),
                            "plugin timed out, killing process"
                        );
                        drop(child.kill());
                        drop(child.wait());
                        return Err(Error::Timeout {
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(EXIT_POLL_INTERVAL);
                }
                Err(err) => {
                    return Err(Error::Io {
                        context: "waiting for plugin exit",
                        source: Arc::new(err),
                    });
                }
            }
        }
    }
}

impl Runner for ExecRunner {
    fn run(&self, env: RunEnv<'_>) -> Result<(), Error> {
        let RunEnv {
            args,
            stdin,
            stdout,
            stderr,
        } = env;
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(&args)
            .env_clear()
            .env(EMPTY_ENV_KEY, "1")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(if stdout.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(if stderr.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        // Working directory is inherited from the caller.

        debug!(
            target: RUNNER_TARGET,
            program = %self.program,
            args = ?args,
            "spawning plugin process"
        );
        let mut child = command.spawn().map_err(|err| Error::Spawn {
            program: self.program.clone(),
            source: Arc::new(err),
        })?;
        let child_stdin = child.stdin.take();
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        // Stdin is pumped and stdout/stderr drained concurrently; a
        // sequential write-then-read deadlocks once a pipe buffer fills.
        let status = std::thread::scope(|scope| -> Result<ExitStatus, Error> {
            if let (Some(reader), Some(mut sink)) = (stdin, child_stdin) {
                scope.spawn(move || {
                    // A closed pipe means the child stopped reading early;
                    // the exit status carries whatever the child decided.
                    if let Err(err) = io::copy(reader, &mut sink) {
                        debug!(target: RUNNER_TARGET, error = %err, "plugin closed stdin early");
                    }
                });
            }
            let stdout_copy = match (stdout, child_stdout) {
                (Some(writer), Some(mut source)) => {
                    Some(scope.spawn(move || io::copy(&mut source, writer)))
                }
                _ => None,
            };
            if let (Some(writer), Some(mut source)) = (stderr, child_stderr) {
                scope.spawn(move || {
                    if let Err(err) = io::copy(&mut source, writer) {
                        debug!(target: RUNNER_TARGET, error = %err, "failed to forward plugin stderr");
                    }
                });
            }
            let status = self.wait_for_exit(&mut child)?;
            if let Some(handle) = stdout_copy {
                match handle.join() {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        return Err(Error::Io {
                            context: "capturing plugin stdout",
                            source: Arc::new(err),
                        });
                    }
                    Err(_) => {
                        return Err(Error::Io {
                            context: "capturing plugin stdout",
                            source: Arc::new(io::Error::other("stdout capture thread panicked")),
                        });
                    }
                }
            }
            Ok(status)
        })?;

        debug!(target: RUNNER_TARGET, program = %self.program, status = ?status, "plugin process exited");
        if status.success() {
            return Ok(());
        }
        let exit_code = status.code().unwrap_or(-1);
        Err(Error::Exit(ExitError::new(
            exit_code,
            format!("plugin '{}' exited with {status}", self.program),
        )))
    }
}

/// Runner that dispatches to a server in-process.
///
/// Primarily used for testing: it exercises flag parsing, envelope framing,
/// and dispatch without spawning a child process, and preserves the exit
/// code semantics because every server failure converts through
/// [`ExitError::wrap`].
pub struct ServerRunner {
    server: Server,
}

impl ServerRunner {
    /// Creates a runner that serves the given server directly.
    #[must_use]
    pub const fn new(server: Server) -> Self {
        Self { server }
    }
}

impl Runner for ServerRunner {
    fn run(&self, env: RunEnv<'_>) -> Result<(), Error> {
        self.server.serve(env)
    }
}
