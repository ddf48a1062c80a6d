//! Spec: the validated set of procedures a plugin advertises.
//!
//! A spec describes the shape of a plugin to clients. It is returned on
//! stdout when the plugin is invoked with `--spec`, and it is the source of
//! truth the server dispatches against. A spec never contains duplicate
//! procedures, whether by path or by args tuple.

use std::collections::HashMap;

use crate::error::Error;
use crate::procedure::{validate_procedures, Procedure};

/// A validated, non-empty, ordered set of [`Procedure`]s with a path index.
///
/// Specs are immutable once constructed; all invariants are enforced by
/// [`Spec::new`].
///
/// # Example
///
/// ```
/// use execrpc::{Procedure, Spec};
///
/// let spec = Spec::new(vec![
///     Procedure::new("/echo.v1.EchoService/Echo").expect("valid procedure"),
/// ])
/// .expect("valid spec");
/// assert!(spec.procedure_for_path("/echo.v1.EchoService/Echo").is_some());
/// assert!(spec.procedure_for_path("/missing").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Spec {
    procedures: Vec<Procedure>,
    path_index: HashMap<String, usize>,
}

impl Spec {
    /// Creates a validated spec from the given procedures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if the sequence is empty, any path is
    /// duplicated, or any non-empty args tuple is duplicated.
    pub fn new(procedures: Vec<Procedure>) -> Result<Self, Error> {
        if procedures.is_empty() {
            return Err(Error::Spec {
                message: String::from("no procedures specified"),
            });
        }
        validate_procedures(&procedures)?;
        let path_index = procedures
            .iter()
            .enumerate()
            .map(|(index, procedure)| (procedure.path().to_owned(), index))
            .collect();
        Ok(Self {
            procedures,
            path_index,
        })
    }

    /// Merges the given specs into one, re-validating the union.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spec`] if any procedures overlap by path or args, or
    /// if no procedures result.
    pub fn merge(specs: Vec<Spec>) -> Result<Self, Error> {
        let procedures = specs
            .into_iter()
            .flat_map(|spec| spec.procedures)
            .collect();
        Self::new(procedures)
    }

    /// Returns the procedure for the given path, if any.
    #[must_use]
    pub fn procedure_for_path(&self, path: &str) -> Option<&Procedure> {
        self.path_index
            .get(path)
            .map(|&index| &self.procedures[index])
    }

    /// Returns all procedures in declaration order. Never empty.
    #[must_use]
    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }
}
