//! Server-side request handling.
//!
//! A [`Handler`] drives one procedure invocation: it reads the request
//! envelope from stdin, decodes it into the request type, invokes the user
//! function, and writes the response envelope to stdout. Any failure along
//! the way is first serialised to stdout as a response-envelope error, so
//! the client always observes a structured failure even when the process
//! exits non-zero.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{Error, RpcError};
use crate::format::Format;
use crate::wire::{self, Message};

/// Stdio slice of the run environment that handle functions may access.
pub struct HandleEnv<'a> {
    /// Carries the request envelope. May be empty.
    pub stdin: &'a mut dyn Read,
    /// Carries the response envelope.
    pub stdout: &'a mut dyn Write,
    /// Free-form diagnostics; not part of the protocol.
    pub stderr: &'a mut dyn Write,
}

/// Per-invocation handling options.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleOptions {
    format: Format,
}

impl HandleOptions {
    /// Creates options with the default binary format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the format used to decode the request and encode the
    /// response and errors.
    #[must_use]
    pub const fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub(crate) const fn format(self) -> Format {
        self.format
    }
}

/// Decodes requests, invokes a user function, and encodes replies.
///
/// Handlers are stateless; the per-call inputs all arrive through
/// [`Handler::handle`]. This is the seam that generated service glue calls
/// when registering an implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Handler;

impl Handler {
    /// Creates a handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Handles one procedure invocation.
    ///
    /// An empty stdin leaves the request at its default value, so handlers
    /// tolerate being invoked without a body.
    ///
    /// # Errors
    ///
    /// Any failure (decode, user function, encode) is serialised to stdout
    /// as a response envelope carrying only the error, then returned so the
    /// process exit status reflects the failure.
    pub fn handle<Req, Resp, F>(
        &self,
        env: HandleEnv<'_>,
        handle_fn: F,
        options: HandleOptions,
    ) -> Result<(), Error>
    where
        Req: Message + Default,
        Resp: Message,
        F: FnOnce(Req) -> Result<Resp, RpcError>,
    {
        let HandleEnv { stdin, stdout, .. } = env;
        let format = options.format();
        match dispatch::<Req, Resp, F>(stdin, &mut *stdout, format, handle_fn) {
            Ok(()) => Ok(()),
            Err(err) => {
                let wire_error = RpcError::wrap(&err);
                let data = wire::marshal_response::<Resp>(format, None, Some(&wire_error))?;
                stdout.write_all(&data).map_err(|io_err| Error::Io {
                    context: "writing error to stdout",
                    source: Arc::new(io_err),
                })?;
                Err(err)
            }
        }
    }
}

fn dispatch<Req, Resp, F>(
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    format: Format,
    handle_fn: F,
) -> Result<(), Error>
where
    Req: Message + Default,
    Resp: Message,
    F: FnOnce(Req) -> Result<Resp, RpcError>,
{
    let mut data = Vec::new();
    stdin.read_to_end(&mut data).map_err(|err| Error::Io {
        context: "reading request from stdin",
        source: Arc::new(err),
    })?;
    let request = wire::unmarshal_request::<Req>(format, &data)?;
    let response = handle_fn(request).map_err(Error::Rpc)?;
    let data = wire::marshal_response(format, Some(&response), None)?;
    stdout.write_all(&data).map_err(|err| Error::Io {
        context: "writing response to stdout",
        source: Arc::new(err),
    })
}

#[cfg(test)]
mod tests;
