//! The seam between the runner and a query-executing database session.

use crate::error::{ProbeError, Result};
use crate::params::ParameterBinding;

/// A live session that executes one query at a time.
pub trait QuerySession {
    /// Executes `query` with `binding` and drains every result row.
    fn run_to_completion(
        &mut self,
        query: &str,
        binding: &ParameterBinding,
    ) -> std::result::Result<(), ProbeError>;

    /// Runs an unparameterized query returning an integer column named `id`.
    fn fetch_ids(&mut self, query: &str) -> std::result::Result<Vec<i64>, ProbeError>;
}

impl<S: QuerySession + ?Sized> QuerySession for Box<S> {
    fn run_to_completion(
        &mut self,
        query: &str,
        binding: &ParameterBinding,
    ) -> std::result::Result<(), ProbeError> {
        (**self).run_to_completion(query, binding)
    }

    fn fetch_ids(&mut self, query: &str) -> std::result::Result<Vec<i64>, ProbeError> {
        (**self).fetch_ids(query)
    }
}

/// Opens sessions. Dropping a session releases its connection.
pub trait Connector {
    type Session: QuerySession;

    /// Endpoint used in log lines and connection errors.
    fn endpoint(&self) -> &str;

    fn connect(&self) -> Result<Self::Session>;
}
