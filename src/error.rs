use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::params::ParameterBinding;

/// Boxed driver error carried through the session seam.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single timed execution.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The per-probe timeout expired before the result was drained.
    #[error("query did not complete within {0:?}")]
    Timeout(Duration),
    /// The driver rejected or failed the query.
    #[error(transparent)]
    Driver(DriverError),
}

impl ProbeError {
    pub fn driver(err: impl Into<DriverError>) -> Self {
        ProbeError::Driver(err.into())
    }
}

/// Error type for every benchmark operation.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Missing or invalid settings; raised before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The query catalog could not be read.
    #[error("query catalog {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },
    /// A session could not be established.
    #[error("could not connect to {uri}: {source}")]
    Connection {
        uri: String,
        #[source]
        source: DriverError,
    },
    /// A probe failed while a query/binding pair was in flight.
    #[error("query {query_id} failed for {params}: {source}")]
    QueryExecution {
        query_id: usize,
        params: ParameterBinding,
        #[source]
        source: ProbeError,
    },
    /// Skip-and-continue left a query without a single successful binding.
    #[error("query {query_id}: every binding failed, nothing to aggregate")]
    AllBindingsFailed { query_id: usize },
    /// The parameter domain asks for more distinct ids than exist.
    #[error("cannot sample {requested} distinct ids from a population of {available}")]
    Sampling { requested: usize, available: usize },
    /// The population query could not be executed.
    #[error("population query failed: {0}")]
    PopulationQuery(#[source] ProbeError),
    /// A generated dataset is missing files or fails verification.
    #[error("dataset {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },
    /// A report document does not match either schema shape.
    #[error("report {path}: {reason}")]
    Report { path: PathBuf, reason: String },
    /// A chart could not be drawn or saved.
    #[error("chart {path}: {reason}")]
    Chart { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BenchError::Configuration(msg.into())
    }
}

/// Result type alias for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;
