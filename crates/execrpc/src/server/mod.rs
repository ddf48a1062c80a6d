//! Plugin serving and dispatch.
//!
//! A [`Server`] owns a [`Spec`] and the handle functions drained from a
//! [`ServerRegistrar`], validated at construction to map one-to-one.
//! [`Server::serve`] is the dispatch loop behind every plugin invocation:
//! it parses the flags, answers handshake queries, and routes the positional
//! selector to the registered handle function. [`serve_main`] wraps the loop
//! in the process exit-code contract.

use std::collections::HashMap;
use std::io::{self, IsTerminal, Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, ExitError};
use crate::flags::{self, Invocation, PROTOCOL_VERSION};
use crate::handler::{HandleEnv, HandleOptions};
use crate::registry::{HandleFn, ServerRegistrar};
use crate::runner::RunEnv;
use crate::spec::Spec;
use crate::wire;

/// Tracing target for server operations.
const SERVER_TARGET: &str = "execrpc::server";

/// Serves a plugin: answers handshake queries and dispatches procedure
/// invocations to registered handle functions.
///
/// # Example
///
/// ```
/// use execrpc::{Procedure, Server, ServerRegistrar, Spec};
///
/// # fn build() -> Result<Server, execrpc::Error> {
/// let spec = Spec::new(vec![Procedure::new("/echo.v1.EchoService/Echo")?])?;
/// let registrar = ServerRegistrar::new();
/// registrar.register("/echo.v1.EchoService/Echo", |_env, _options| Ok(()));
/// let server = Server::new(spec, registrar)?.with_doc("An echo plugin.");
/// # Ok(server)
/// # }
/// ```
pub struct Server {
    spec: Spec,
    handlers: HashMap<String, HandleFn>,
    doc: Option<String>,
}

impl Server {
    /// Creates a server from a spec and a registrar.
    ///
    /// Draining the registrar seals it; no further paths can be registered
    /// once the server exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if registration recorded any failures, if a
    /// registered path is not contained within the spec, or if a spec
    /// procedure has no registered handle function.
    pub fn new(spec: Spec, registrar: ServerRegistrar) -> Result<Self, Error> {
        let handlers = registrar.drain()?;
        for path in handlers.keys() {
            if spec.procedure_for_path(path).is_none() {
                return Err(Error::Spec {
                    message: format!("path '{path}' not contained within spec"),
                });
            }
        }
        for procedure in spec.procedures() {
            if !handlers.contains_key(procedure.path()) {
                return Err(Error::Spec {
                    message: format!("path '{}' not registered", procedure.path()),
                });
            }
        }
        Ok(Self {
            spec,
            handlers,
            doc: None,
        })
    }

    /// Attaches documentation rendered as the help-text preamble.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Returns the spec the server dispatches against.
    #[must_use]
    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// Serves one plugin invocation.
    ///
    /// # Errors
    ///
    /// Flag failures surface as [`Error::Usage`], an unmatched selector as
    /// [`Error::UnrecognizedArgs`], and handler failures as whatever the
    /// handle function reported (already serialised to stdout as a response
    /// envelope).
    pub fn serve(&self, env: RunEnv<'_>) -> Result<(), Error> {
        let RunEnv {
            args,
            stdin,
            stdout,
            stderr,
        } = env;
        let mut empty_stdin = io::empty();
        let mut stdout_sink = io::sink();
        let mut stderr_sink = io::sink();
        let stdin: &mut dyn Read = match stdin {
            Some(reader) => reader,
            None => &mut empty_stdin,
        };
        let stdout: &mut dyn Write = match stdout {
            Some(writer) => writer,
            None => &mut stdout_sink,
        };
        let stderr: &mut dyn Write = match stderr {
            Some(writer) => writer,
            None => &mut stderr_sink,
        };

        match flags::parse(&args, &self.spec, self.doc.as_deref())? {
            Invocation::Help(text) => {
                stdout.write_all(text.as_bytes()).map_err(|err| Error::Io {
                    context: "writing help to stdout",
                    source: Arc::new(err),
                })
            }
            Invocation::Protocol => stdout
                .write_all(&flags::encode_protocol(PROTOCOL_VERSION))
                .map_err(|err| Error::Io {
                    context: "writing protocol version to stdout",
                    source: Arc::new(err),
                }),
            Invocation::PrintSpec { format } => {
                let data = wire::marshal_spec(format, &self.spec)?;
                stdout.write_all(&data).map_err(|err| Error::Io {
                    context: "writing spec to stdout",
                    source: Arc::new(err),
                })
            }
            Invocation::Call { selector, format } => {
                // An empty selector never matches, not even a procedure with
                // an empty args tuple; it should steer the user to --help.
                if selector.is_empty() {
                    return Err(Error::UnrecognizedArgs { args: selector });
                }
                for procedure in self.spec.procedures() {
                    let matches_path =
                        selector.len() == 1 && selector[0] == procedure.path();
                    let matches_args =
                        !procedure.args().is_empty() && selector == procedure.args();
                    if matches_path || matches_args {
                        debug!(
                            target: SERVER_TARGET,
                            path = procedure.path(),
                            format = %format,
                            "dispatching procedure"
                        );
                        let Some(handle_fn) = self.handlers.get(procedure.path()) else {
                            // Construction guarantees the mapping; reaching
                            // this means the invariant broke.
                            return Err(Error::Spec {
                                message: format!(
                                    "path '{}' has no registered handle function",
                                    procedure.path()
                                ),
                            });
                        };
                        let handle_env = HandleEnv {
                            stdin,
                            stdout,
                            stderr,
                        };
                        return handle_fn(
                            handle_env,
                            HandleOptions::new().with_format(format),
                        );
                    }
                }
                Err(Error::UnrecognizedArgs { args: selector })
            }
        }
    }
}

/// Runs a server as a process main: serves one invocation over the real
/// stdio and exits with the code mandated by the outcome.
///
/// A terminal stdin is treated as empty so a plugin invoked interactively
/// without a body does not block. On failure the rendered error goes to
/// stderr and the process exits with [`ExitError::wrap`]'s code: the exact
/// code for exit errors, 1 for everything else. On success the process
/// exits 0.
pub fn serve_main<F>(new_server: F) -> !
where
    F: FnOnce() -> Result<Server, Error>,
{
    let result = new_server().and_then(|server| {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut stdin: Box<dyn Read + Send> = if io::stdin().is_terminal() {
            Box::new(io::empty())
        } else {
            Box::new(io::stdin())
        };
        let mut stdout = io::stdout();
        let mut stderr = io::stderr();
        server.serve(RunEnv {
            args,
            stdin: Some(stdin.as_mut()),
            stdout: Some(&mut stdout),
            stderr: Some(&mut stderr),
        })
    });
    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            let rendered = err.to_string();
            if !rendered.is_empty() {
                eprintln!("{rendered}");
            }
            std::process::exit(ExitError::wrap(err).exit_code());
        }
    }
}
