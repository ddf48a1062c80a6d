//! Procedure identity and validation.
//!
//! A procedure is a single callable unit a plugin exposes: a URI-shaped path
//! plus an optional tuple of CLI args that alias it on the command line.
//! Validation is eager at construction, so a [`Procedure`] value is always
//! well-formed.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::Error;

/// Minimum length of a procedure arg.
const MIN_ARG_LENGTH: usize = 2;

/// Args never start or end with a dash or underscore.
static ARG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^[a-zA-Z0-9][a-zA-Z0-9_-]*[a-zA-Z0-9]$").expect("arg pattern compiles")
});

/// Fixed base against which procedure paths are resolved for validation.
static VALIDATION_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("plugin://localhost").expect("validation base parses"));

/// A single procedure that a plugin exposes.
///
/// The path is an absolute URI path beginning with `/`. When the args tuple
/// is empty, the procedure is invoked with the single positional arg equal
/// to its path; otherwise the args tuple is the selector.
///
/// # Example
///
/// ```
/// use execrpc::Procedure;
///
/// let procedure = Procedure::with_args(
///     "/echo.v1.EchoService/Echo",
///     vec!["echo".into(), "request".into()],
/// )
/// .expect("valid procedure");
/// assert_eq!(procedure.path(), "/echo.v1.EchoService/Echo");
/// assert_eq!(procedure.args(), &["echo", "request"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    path: String,
    args: Vec<String>,
}

impl Procedure {
    /// Creates a validated procedure with no args alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if the path is empty, does not begin with
    /// `/`, or is not a valid URI path.
    pub fn new(path: impl Into<String>) -> Result<Self, Error> {
        Self::with_args(path, Vec::new())
    }

    /// Creates a validated procedure with an args alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if the path is invalid or any arg is shorter
    /// than two characters, uses characters outside `[a-zA-Z0-9-_]`, or
    /// starts or ends with a dash or underscore.
    pub fn with_args(path: impl Into<String>, args: Vec<String>) -> Result<Self, Error> {
        let procedure = Self {
            path: path.into(),
            args,
        };
        procedure.validate()?;
        Ok(procedure)
    }

    /// Returns the path of the procedure.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the args that alias the procedure on the command line.
    /// Empty when the procedure is invoked by path.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn validate(&self) -> Result<(), Error> {
        if self.path.is_empty() {
            return Err(Error::Spec {
                message: String::from("procedure path is empty"),
            });
        }
        if !self.path.starts_with('/') {
            return Err(Error::Spec {
                message: format!("procedure path '{}' must begin with '/'", self.path),
            });
        }
        let resolved = VALIDATION_BASE.join(&self.path).map_err(|err| Error::Spec {
            message: format!("invalid procedure path '{}': {err}", self.path),
        })?;
        // A path that does not round-trip needed percent-encoding, which
        // means it contained characters a URI path cannot carry verbatim.
        if resolved.path() != self.path {
            return Err(Error::Spec {
                message: format!(
                    "invalid procedure path '{}': not a valid URI path",
                    self.path
                ),
            });
        }
        for arg in &self.args {
            if arg.len() < MIN_ARG_LENGTH {
                return Err(Error::Spec {
                    message: format!(
                        "arg '{arg}' for procedure '{}' must be at least length {MIN_ARG_LENGTH}",
                        self.path
                    ),
                });
            }
            if !ARG_PATTERN.is_match(arg) {
                return Err(Error::Spec {
                    message: format!(
                        "arg '{arg}' for procedure '{}' must only use characters [a-zA-Z0-9-_] \
                         and cannot start or end with a dash or underscore",
                        self.path
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Validates cross-procedure uniqueness invariants for a spec.
pub(crate) fn validate_procedures(procedures: &[Procedure]) -> Result<(), Error> {
    let mut seen_paths = HashSet::new();
    let mut seen_args = HashSet::new();
    for procedure in procedures {
        if !seen_paths.insert(procedure.path().to_owned()) {
            return Err(Error::Spec {
                message: format!("duplicate procedure path: '{}'", procedure.path()),
            });
        }
        if !procedure.args().is_empty() {
            // Args never contain spaces, so the joined form cannot collide
            // across distinct tuples.
            let joined = procedure.args().join(" ");
            if !seen_args.insert(joined.clone()) {
                return Err(Error::Spec {
                    message: format!("duplicate procedure args: '{joined}'"),
                });
            }
        }
    }
    Ok(())
}
