//! The benchmark runner: sweeps every query over every binding, sequentially.
//!
//! One session executes one probe at a time. Measurement never overlaps
//! with other queries, because concurrent load would warm shared caches and
//! blur what "cold" means.

use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::catalog::QueryTemplate;
use crate::config::RunConfig;
use crate::error::{BenchError, ProbeError, Result};
use crate::harness::{mean, measure_cold_hot, measure_plain};
use crate::params::{self, ParameterBinding};
use crate::report;
use crate::schema::{BenchmarkReport, ColdHotQueryResult, FailedBinding, PlainQueryResult};
use crate::session::Connector;
use crate::{ConnectionPolicy, FailurePolicy, RunMode};

/// Knobs that shape one measurement run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub mode: RunMode,
    pub runs_per_binding: usize,
    pub regions: Vec<String>,
    pub connection: ConnectionPolicy,
    pub failure: FailurePolicy,
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.runs_per_binding == 0 {
            return Err(BenchError::config("runs per binding must be at least 1"));
        }
        if self.regions.is_empty() {
            return Err(BenchError::config("at least one region is required"));
        }
        Ok(())
    }
}

/// Successful per-binding results plus the bindings that were skipped.
struct Sweep<T> {
    results: Vec<T>,
    failures: Vec<FailedBinding>,
}

pub struct BenchmarkRunner<C> {
    connector: C,
    config: RunnerConfig,
}

impl<C: Connector> BenchmarkRunner<C> {
    pub fn new(connector: C, config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs the full protocol and returns the report in processing order.
    ///
    /// `catalog` must already be filtered, ordered, and numbered.
    pub fn run(&self, catalog: &[QueryTemplate], domain: &[i64]) -> Result<BenchmarkReport> {
        if catalog.is_empty() {
            return Err(BenchError::config(
                "no catalog queries left to benchmark after the id filter",
            ));
        }
        if domain.is_empty() {
            return Err(BenchError::config("the parameter domain is empty"));
        }
        let bindings = params::bindings(domain, &self.config.regions)?;
        info!(
            queries = catalog.len(),
            bindings = bindings.len(),
            runs = self.config.runs_per_binding,
            mode = ?self.config.mode,
            connection = ?self.config.connection,
            endpoint = self.connector.endpoint(),
            "starting benchmark"
        );

        let report = match self.config.mode {
            RunMode::Plain => BenchmarkReport::Plain(self.each_query(catalog, |session, q| {
                let sweep = self.sweep(q, &bindings, |b| {
                    measure_plain(session, q, b, self.config.runs_per_binding)
                })?;
                let means: Vec<f64> = sweep.results.iter().map(|r| r.mean).collect();
                let result = PlainQueryResult {
                    query_id: q.id,
                    query: q.text.clone(),
                    runs_per_query: self.config.runs_per_binding,
                    parameter_count: sweep.results.len(),
                    overall_mean_sec: mean(&means),
                    per_param_results: sweep.results,
                    failed_params: sweep.failures,
                };
                info!(
                    query_id = q.id,
                    overall_mean_sec = result.overall_mean_sec,
                    "query done"
                );
                Ok(result)
            })?),
            RunMode::ColdHot => BenchmarkReport::ColdHot(self.each_query(catalog, |session, q| {
                let sweep = self.sweep(q, &bindings, |b| {
                    measure_cold_hot(session, q, b, self.config.runs_per_binding)
                })?;
                let colds: Vec<f64> = sweep.results.iter().map(|r| r.cold_time).collect();
                let hots: Vec<f64> = sweep.results.iter().map(|r| r.hot_mean).collect();
                let result = ColdHotQueryResult {
                    query_id: q.id,
                    query: q.text.clone(),
                    total_params: sweep.results.len(),
                    cold_avg_sec: mean(&colds),
                    hot_avg_sec: mean(&hots),
                    per_param_results: sweep.results,
                    failed_params: sweep.failures,
                };
                info!(
                    query_id = q.id,
                    cold_avg_sec = result.cold_avg_sec,
                    hot_avg_sec = result.hot_avg_sec,
                    "query done"
                );
                Ok(result)
            })?),
        };
        Ok(report)
    }

    /// Hands each query a session according to the connection policy.
    ///
    /// Sessions are dropped when they go out of scope, on success and on
    /// error alike.
    fn each_query<T>(
        &self,
        catalog: &[QueryTemplate],
        mut per_query: impl FnMut(&mut C::Session, &QueryTemplate) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(catalog.len());
        match self.config.connection {
            ConnectionPolicy::PerRun => {
                let mut session = self.connector.connect()?;
                for q in catalog {
                    info!(query_id = q.id, query = %q.text, "running query");
                    out.push(per_query(&mut session, q)?);
                }
            }
            ConnectionPolicy::PerQuery => {
                for q in catalog {
                    info!(query_id = q.id, query = %q.text, "running query on a fresh session");
                    let mut session = self.connector.connect()?;
                    out.push(per_query(&mut session, q)?);
                }
            }
        }
        Ok(out)
    }

    /// Measures every binding in domain order, applying the failure policy.
    fn sweep<T>(
        &self,
        query: &QueryTemplate,
        bindings: &[ParameterBinding],
        mut measure: impl FnMut(&ParameterBinding) -> std::result::Result<T, ProbeError>,
    ) -> Result<Sweep<T>> {
        let mut results = Vec::with_capacity(bindings.len());
        let mut failures = Vec::new();
        for binding in bindings {
            match measure(binding) {
                Ok(r) => {
                    debug!(query_id = query.id, params = %binding, "binding measured");
                    results.push(r);
                }
                Err(source) => match self.config.failure {
                    FailurePolicy::FailFast => {
                        return Err(BenchError::QueryExecution {
                            query_id: query.id,
                            params: binding.clone(),
                            source,
                        });
                    }
                    FailurePolicy::SkipAndContinue => {
                        warn!(query_id = query.id, params = %binding, error = %source, "skipping binding");
                        failures.push(FailedBinding {
                            params: binding.clone(),
                            error: source.to_string(),
                        });
                    }
                },
            }
        }
        if results.is_empty() {
            return Err(BenchError::AllBindingsFailed { query_id: query.id });
        }
        Ok(Sweep { results, failures })
    }
}

/// Resolves the domain, runs every query, and persists the report.
///
/// The domain is resolved (and any sampling error raised) before the first
/// probe. Nothing is written unless the whole run succeeds.
pub fn execute<C: Connector>(
    config: &RunConfig,
    catalog: &[QueryTemplate],
    connector: C,
    out: Option<&Path>,
) -> Result<BenchmarkReport> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let domain = params::resolve_domain(&config.domain, &connector, &mut rng)?;
    let runner = BenchmarkRunner::new(connector, config.runner.clone())?;
    let report = runner.run(catalog, &domain)?;
    if let Some(path) = out {
        report::write_report(path, &report)?;
        info!(path = %path.display(), queries = report.len(), "report written");
    }
    Ok(report)
}
