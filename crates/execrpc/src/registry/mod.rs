//! One-shot registration of handle functions by procedure path.
//!
//! Splitting registration out of the server keeps the server immutable:
//! callers register paths on a [`ServerRegistrar`], then hand it to
//! [`Server::new`](crate::server::Server::new), which drains it exactly
//! once. Registration never fails directly; duplicate paths and post-seal
//! registrations accumulate and surface when the registrar is drained.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::Error;
use crate::handler::{HandleEnv, HandleOptions};

/// Type-erased handle function stored per procedure path.
pub(crate) type HandleFn =
    Box<dyn Fn(HandleEnv<'_>, HandleOptions) -> Result<(), Error> + Send + Sync>;

/// Thread-safe one-shot mapping from procedure path to handle function.
///
/// # Example
///
/// ```
/// use execrpc::ServerRegistrar;
///
/// let registrar = ServerRegistrar::new();
/// registrar.register("/echo.v1.EchoService/Echo", |_env, _options| Ok(()));
/// ```
#[derive(Default)]
pub struct ServerRegistrar {
    state: Mutex<RegistrarState>,
}

#[derive(Default)]
struct RegistrarState {
    handlers: HashMap<String, HandleFn>,
    errors: Vec<String>,
    sealed: bool,
}

impl ServerRegistrar {
    /// Creates an empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle function for the given path.
    ///
    /// Paths must be unique. A duplicate path or a registration after the
    /// registrar has been used is recorded and reported when the server is
    /// constructed.
    pub fn register<F>(&self, path: impl Into<String>, handle_fn: F)
    where
        F: Fn(HandleEnv<'_>, HandleOptions) -> Result<(), Error> + Send + Sync + 'static,
    {
        let path = path.into();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.sealed {
            state
                .errors
                .push(String::from("server registrar already used"));
            return;
        }
        if state.handlers.contains_key(&path) {
            state.errors.push(format!("path '{path}' already registered"));
            return;
        }
        state.handlers.insert(path, Box::new(handle_fn));
    }

    /// Seals the registrar and hands over the accumulated mapping.
    ///
    /// Called at most once in practice, by server construction.
    pub(crate) fn drain(&self) -> Result<HashMap<String, HandleFn>, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sealed = true;
        if !state.errors.is_empty() {
            return Err(Error::Spec {
                message: state.errors.join("; "),
            });
        }
        Ok(std::mem::take(&mut state.handlers))
    }
}
