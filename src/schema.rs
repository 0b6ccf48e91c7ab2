use serde::{Deserialize, Serialize};

use crate::params::ParameterBinding;
use crate::{ConnectionPolicy, FailurePolicy, RunMode};

pub const SCHEMA_VERSION: u32 = 1;

/// Sidecar describing how a report was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub mode: RunMode,
    pub runs_per_binding: usize,
    pub connection_policy: ConnectionPolicy,
    pub failure_policy: FailurePolicy,
    pub seed: u64,
    pub endpoint: String,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

/// A binding left out of aggregation under skip-and-continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedBinding {
    pub params: ParameterBinding,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainBindingResult {
    pub params: ParameterBinding,
    pub runs: Vec<f64>,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColdHotBindingResult {
    pub params: ParameterBinding,
    pub cold_time: f64,
    pub hot_times: Vec<f64>,
    pub hot_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainQueryResult {
    pub query_id: usize,
    pub query: String,
    pub runs_per_query: usize,
    pub parameter_count: usize,
    pub overall_mean_sec: f64,
    pub per_param_results: Vec<PlainBindingResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_params: Vec<FailedBinding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColdHotQueryResult {
    pub query_id: usize,
    pub query: String,
    pub total_params: usize,
    pub cold_avg_sec: f64,
    pub hot_avg_sec: f64,
    pub per_param_results: Vec<ColdHotBindingResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_params: Vec<FailedBinding>,
}

/// One run's results, serialized as a bare JSON array of query objects.
///
/// Deserialization picks the shape by field presence: cold/hot entries
/// carry `cold_avg_sec`, plain entries carry `runs_per_query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BenchmarkReport {
    ColdHot(Vec<ColdHotQueryResult>),
    Plain(Vec<PlainQueryResult>),
}

/// Mode-independent per-query view used by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySummary {
    pub query_id: usize,
    /// `None` for plain reports.
    pub cold_avg_sec: Option<f64>,
    /// Hot mean for cold/hot reports, overall mean for plain ones.
    pub hot_avg_sec: f64,
}

/// Mode-independent per-binding view used by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingPoint {
    pub query_id: usize,
    pub params: ParameterBinding,
    pub cold_time: Option<f64>,
    pub hot_mean: f64,
}

impl BenchmarkReport {
    pub fn mode(&self) -> RunMode {
        match self {
            BenchmarkReport::Plain(_) => RunMode::Plain,
            BenchmarkReport::ColdHot(_) => RunMode::ColdHot,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BenchmarkReport::Plain(q) => q.len(),
            BenchmarkReport::ColdHot(q) => q.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summaries(&self) -> Vec<QuerySummary> {
        match self {
            BenchmarkReport::Plain(queries) => queries
                .iter()
                .map(|q| QuerySummary {
                    query_id: q.query_id,
                    cold_avg_sec: None,
                    hot_avg_sec: q.overall_mean_sec,
                })
                .collect(),
            BenchmarkReport::ColdHot(queries) => queries
                .iter()
                .map(|q| QuerySummary {
                    query_id: q.query_id,
                    cold_avg_sec: Some(q.cold_avg_sec),
                    hot_avg_sec: q.hot_avg_sec,
                })
                .collect(),
        }
    }

    pub fn binding_points(&self) -> Vec<BindingPoint> {
        match self {
            BenchmarkReport::Plain(queries) => queries
                .iter()
                .flat_map(|q| {
                    q.per_param_results.iter().map(move |p| BindingPoint {
                        query_id: q.query_id,
                        params: p.params.clone(),
                        cold_time: None,
                        hot_mean: p.mean,
                    })
                })
                .collect(),
            BenchmarkReport::ColdHot(queries) => queries
                .iter()
                .flat_map(|q| {
                    q.per_param_results.iter().map(move |p| BindingPoint {
                        query_id: q.query_id,
                        params: p.params.clone(),
                        cold_time: Some(p.cold_time),
                        hot_mean: p.hot_mean,
                    })
                })
                .collect(),
        }
    }
}
