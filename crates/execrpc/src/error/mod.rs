//! Failure taxonomy for plugin calls.
//!
//! Two orthogonal error kinds cross the process boundary. An [`RpcError`] is
//! a semantic failure of a procedure call: a [`Code`] plus a non-empty
//! message, serialised inside the response envelope and surfaced end to end.
//! An [`ExitError`] is a process-level failure: a non-zero exit code raised
//! by runners and by main wrappers.
//!
//! Both are embedded in the crate-wide [`Error`] enum. I/O errors are
//! wrapped in `Arc` so the enum stays `Clone`, which the client's sticky
//! spec cache relies on.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error as ThisError;

use crate::code::Code;

/// Exit code substituted whenever a failure has no inferable code of its own.
const EXIT_CODE_INTERNAL: i32 = 1;

/// Semantic failure of a procedure call, carried inside the response
/// envelope.
///
/// Construction normalises malformed inputs so the wire form is always
/// well-formed: an empty message is rewritten to [`Code::Internal`] with a
/// diagnostic, and [`RpcError::from_wire`] rewrites invalid codes the same
/// way.
///
/// # Example
///
/// ```
/// use execrpc::{Code, RpcError};
///
/// let error = RpcError::new(Code::DeadlineExceeded, "backend timed out");
/// assert_eq!(error.code(), Code::DeadlineExceeded);
/// assert_eq!(error.message(), "backend timed out");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("failed with code {code}: {message}")]
pub struct RpcError {
    code: Code,
    message: String,
}

impl RpcError {
    /// Creates an error with the given code and message.
    ///
    /// An empty or blank message is rewritten to [`Code::Internal`] with a
    /// diagnostic message, so the returned error always carries a usable
    /// description.
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self {
                code: Code::Internal,
                message: format!("error created with code {code} and empty message"),
            };
        }
        Self { code, message }
    }

    /// Creates an error from its wire representation.
    ///
    /// A code outside the defined range is rewritten to [`Code::Internal`],
    /// keeping the original message in the diagnostic.
    #[must_use]
    pub fn from_wire(code: u32, message: impl Into<String>) -> Self {
        match Code::from_wire(code) {
            Some(code) => Self::new(code, message),
            None => Self {
                code: Code::Internal,
                message: format!(
                    "error created with invalid code {code}: {}",
                    message.into()
                ),
            },
        }
    }

    /// Returns the embedded RPC error when `err` carries one, otherwise a
    /// [`Code::Unknown`] error built from the rendered failure.
    #[must_use]
    pub fn wrap(err: &Error) -> Self {
        match err {
            Error::Rpc(rpc_error) => rpc_error.clone(),
            other => Self::new(Code::Unknown, other.to_string()),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Process-level failure with a non-zero exit code.
///
/// Runners return exit errors to report the exit code of a plugin process;
/// [`serve_main`](crate::server::serve_main) uses them to translate a
/// serve failure into the process exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitError {
    exit_code: i32,
    detail: Option<String>,
}

impl ExitError {
    /// Creates an exit error with the given code and detail.
    ///
    /// An exit code of zero would claim success, so it is coerced to 1 with
    /// a diagnostic wrapping the offending input.
    #[must_use]
    pub fn new(exit_code: i32, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = (!detail.is_empty()).then_some(detail);
        if exit_code == 0 {
            return Self {
                exit_code: EXIT_CODE_INTERNAL,
                detail: Some(match detail {
                    Some(detail) => format!("exit error created with code 0: {detail}"),
                    None => String::from("exit error created with code 0"),
                }),
            };
        }
        Self { exit_code, detail }
    }

    /// Wraps an arbitrary failure as an exit error.
    ///
    /// An [`Error::Exit`] passes through unchanged; anything else becomes an
    /// exit error with code 1 carrying the rendered failure.
    #[must_use]
    pub fn wrap(err: Error) -> Self {
        match err {
            Error::Exit(exit_error) => exit_error,
            other => Self::new(EXIT_CODE_INTERNAL, other.to_string()),
        }
    }

    /// Returns the process exit code. Never zero.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns the underlying failure description, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exited with code {}", self.exit_code)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExitError {}

/// Errors arising from plugin calls and plugin serving.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// A procedure failed with a structured RPC error.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// A plugin process terminated with a non-zero exit code.
    #[error(transparent)]
    Exit(#[from] ExitError),

    /// A procedure or spec failed validation.
    #[error("invalid spec: {message}")]
    Spec {
        /// Description of the validation failure.
        message: String,
    },

    /// The invocation flags could not be parsed.
    #[error("{message}")]
    Usage {
        /// Rendered usage failure, including the offending flag.
        message: String,
    },

    /// A message could not be encoded in the selected format.
    #[error("failed to encode {what}: {message}")]
    Serialize {
        /// What was being encoded.
        what: &'static str,
        /// Description of the encoding failure.
        message: String,
    },

    /// A message could not be decoded in the selected format.
    #[error("failed to decode {what}: {message}")]
    Deserialize {
        /// What was being decoded.
        what: &'static str,
        /// Description of the decoding failure.
        message: String,
    },

    /// A payload's type URL did not match the expected message type.
    #[error("payload type mismatch: expected '{expected}', got '{actual}'")]
    TypeMismatch {
        /// Type URL of the expected message type.
        expected: &'static str,
        /// Type URL found in the payload.
        actual: String,
    },

    /// The plugin handshake produced an unusable protocol or spec reply.
    #[error("{message}")]
    Handshake {
        /// Description of the handshake failure.
        message: String,
    },

    /// No procedure with the requested path exists in the spec.
    #[error("no procedure for path '{path}'")]
    UnknownProcedure {
        /// Path that was looked up.
        path: String,
    },

    /// The positional arguments did not select any procedure.
    #[error("args not recognised: {args:?}")]
    UnrecognizedArgs {
        /// The positional arguments as given.
        args: Vec<String>,
    },

    /// The plugin process could not be spawned.
    #[error("failed to spawn plugin '{program}': {source}")]
    Spawn {
        /// Program that was being executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// An I/O failure while exchanging data with the plugin.
    #[error("I/O error {context}: {source}")]
    Io {
        /// What the I/O operation was doing.
        context: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The plugin did not exit within the configured timeout.
    #[error("plugin timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
}
