//! Client-side dispatch.
//!
//! A [`Client`] resolves a plugin's [`Spec`] through the handshake
//! (`--protocol`, then `--spec`), caches the result for its lifetime, and
//! invokes procedures by running the plugin with the selector on argv and
//! the request envelope on stdin. One call spawns one plugin execution;
//! concurrent calls are independent.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::error::{Error, ExitError};
use crate::flags::{self, FORMAT_FLAG, PROTOCOL_FLAG, PROTOCOL_VERSION, SPEC_FLAG};
use crate::format::Format;
use crate::runner::{RunEnv, Runner};
use crate::spec::Spec;
use crate::wire::{self, Message};

/// Tracing target for client operations.
const CLIENT_TARGET: &str = "execrpc::client";

/// Client that calls plugin procedures over one-shot process executions.
///
/// Typically a client is not invoked directly; generated service glue uses
/// it to call the procedures a service declares.
///
/// # Example
///
/// ```rust,no_run
/// use execrpc::{Client, ExecRunner, Format};
///
/// let client = Client::new(ExecRunner::new("echo-plugin")).with_format(Format::Json);
/// let _spec = client.spec()?;
/// # Ok::<(), execrpc::Error>(())
/// ```
pub struct Client<R> {
    runner: R,
    format: Format,
    stderr: Mutex<Box<dyn Write + Send>>,
    spec_cache: RwLock<Option<Result<Spec, Error>>>,
}

impl<R: Runner> Client<R> {
    /// Creates a client for the given runner with the binary format and
    /// plugin stderr discarded.
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            format: Format::default(),
            stderr: Mutex::new(Box::new(io::sink())),
            spec_cache: RwLock::new(None),
        }
    }

    /// Selects the format used for request, response, and spec bodies.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Forwards plugin stderr to the given writer instead of discarding it.
    #[must_use]
    pub fn with_stderr(mut self, stderr: Box<dyn Write + Send>) -> Self {
        self.stderr = Mutex::new(stderr);
        self
    }

    /// Returns the plugin's spec, performing the handshake on first use.
    ///
    /// Both the spec and a handshake failure are cached for the lifetime of
    /// the client, and concurrent first callers collapse onto a single
    /// handshake. A plugin whose spec changes mid-session requires a new
    /// client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] when the plugin speaks an unknown
    /// protocol version or prints an unusable spec, or the runner's failure
    /// when the plugin could not be executed at all.
    pub fn spec(&self) -> Result<Spec, Error> {
        if let Some(cached) = self
            .spec_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return cached.clone();
        }
        let mut cache = self
            .spec_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.as_ref() {
            return cached.clone();
        }
        let resolved = self.resolve_spec();
        *cache = Some(resolved.clone());
        resolved
    }

    /// Calls the procedure with the given path.
    ///
    /// The request is sent over stdin and the response read from stdout. A
    /// `None` request sends an empty body; a response envelope with no
    /// payload yields the response type's default value.
    ///
    /// # Errors
    ///
    /// A structured failure reported by the plugin surfaces as
    /// [`Error::Rpc`]; a plugin execution that failed without a structured
    /// error surfaces as [`Error::Exit`] carrying the child's exit code.
    pub fn call<Req, Resp>(
        &self,
        procedure_path: &str,
        request: Option<&Req>,
    ) -> Result<Resp, Error>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let spec = self.spec()?;
        let procedure =
            spec.procedure_for_path(procedure_path)
                .ok_or_else(|| Error::UnknownProcedure {
                    path: procedure_path.to_owned(),
                })?;
        let mut args = if procedure.args().is_empty() {
            vec![procedure.path().to_owned()]
        } else {
            procedure.args().to_vec()
        };
        args.push(format!("--{FORMAT_FLAG}"));
        args.push(self.format.to_string());

        let request_data = wire::marshal_request(self.format, request)?;
        debug!(
            target: CLIENT_TARGET,
            path = procedure_path,
            args = ?args,
            request_bytes = request_data.len(),
            "calling procedure"
        );
        let mut stdout = Vec::new();
        if let Err(err) = self.run(args, Some(request_data), &mut stdout) {
            // A structured error on stdout wins over the bare exit status:
            // the plugin exits non-zero for RPC failures too.
            if let Some(rpc_error) = wire::embedded_response_error(self.format, &stdout) {
                return Err(Error::Rpc(rpc_error));
            }
            return Err(Error::Exit(ExitError::wrap(err)));
        }
        wire::unmarshal_response(self.format, &stdout)
    }

    fn resolve_spec(&self) -> Result<Spec, Error> {
        self.check_protocol_version()?;
        debug!(target: CLIENT_TARGET, format = %self.format, "requesting plugin spec");
        let mut stdout = Vec::new();
        self.run(
            vec![
                format!("--{SPEC_FLAG}"),
                format!("--{FORMAT_FLAG}"),
                self.format.to_string(),
            ],
            None,
            &mut stdout,
        )?;
        if stdout.is_empty() {
            return Err(Error::Handshake {
                message: format!("--{SPEC_FLAG} did not return a spec"),
            });
        }
        wire::unmarshal_spec(self.format, &stdout).map_err(|err| Error::Handshake {
            message: format!("--{SPEC_FLAG} did not return a properly-formed spec: {err}"),
        })
    }

    fn check_protocol_version(&self) -> Result<(), Error> {
        let mut stdout = Vec::new();
        self.run(vec![format!("--{PROTOCOL_FLAG}")], None, &mut stdout)?;
        if stdout.is_empty() {
            return Err(Error::Handshake {
                message: format!("--{PROTOCOL_FLAG} did not return a protocol version"),
            });
        }
        let version = flags::decode_protocol(&stdout).map_err(|err| Error::Handshake {
            message: format!(
                "--{PROTOCOL_FLAG} did not return a properly-formed protocol version: {err}"
            ),
        })?;
        if version != PROTOCOL_VERSION {
            return Err(Error::Handshake {
                message: format!("--{PROTOCOL_FLAG} returned unknown protocol version {version}"),
            });
        }
        Ok(())
    }

    fn run(
        &self,
        args: Vec<String>,
        stdin: Option<Vec<u8>>,
        stdout: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let mut stderr = self.stderr.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdin_reader = stdin.map(Cursor::new);
        self.runner.run(RunEnv {
            args,
            stdin: stdin_reader
                .as_mut()
                .map(|cursor| cursor as &mut (dyn Read + Send)),
            stdout: Some(stdout),
            stderr: Some(stderr.as_mut()),
        })
    }
}
