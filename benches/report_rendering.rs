//! Report aggregation and rendering benchmark suite
//!
//! Runs the full plain and cold/hot protocol against an in-process session
//! that returns immediately, so the numbers isolate runner and report
//! overhead from database latency.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cypher_latency_bench::catalog::QueryTemplate;
use cypher_latency_bench::params::{ParameterBinding, DEFAULT_REGIONS};
use cypher_latency_bench::render::{hot_table, LabelledReport};
use cypher_latency_bench::runner::{BenchmarkRunner, RunnerConfig};
use cypher_latency_bench::session::{Connector, QuerySession};
use cypher_latency_bench::{ConnectionPolicy, FailurePolicy, ProbeError, Result, RunMode};

struct NullSession;

impl QuerySession for NullSession {
    fn run_to_completion(
        &mut self,
        _query: &str,
        _binding: &ParameterBinding,
    ) -> std::result::Result<(), ProbeError> {
        Ok(())
    }

    fn fetch_ids(&mut self, _query: &str) -> std::result::Result<Vec<i64>, ProbeError> {
        Ok(Vec::new())
    }
}

struct NullConnector;

impl Connector for NullConnector {
    type Session = NullSession;

    fn endpoint(&self) -> &str {
        "null://"
    }

    fn connect(&self) -> Result<NullSession> {
        Ok(NullSession)
    }
}

fn catalog(n: usize) -> Vec<QueryTemplate> {
    (1..=n)
        .map(|id| QueryTemplate {
            id,
            text: format!("MATCH (u:User {{user_id: $userId}}) RETURN u LIMIT {id}"),
        })
        .collect()
}

fn runner(mode: RunMode) -> BenchmarkRunner<NullConnector> {
    BenchmarkRunner::new(
        NullConnector,
        RunnerConfig {
            mode,
            runs_per_binding: 5,
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            connection: ConnectionPolicy::PerRun,
            failure: FailurePolicy::FailFast,
        },
    )
    .unwrap()
}

fn bench_runner_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("runner_overhead");
    let queries = catalog(10);

    for params in [50i64, 500] {
        let domain: Vec<i64> = (1..=params).collect();
        for mode in [RunMode::Plain, RunMode::ColdHot] {
            let r = runner(mode);
            let name = format!("{mode:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, params), &domain, |b, domain| {
                b.iter(|| black_box(r.run(&queries, black_box(domain)).unwrap()))
            });
        }
    }

    group.finish();
}

fn bench_latex(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let domain: Vec<i64> = (1..=500).collect();
    let report = runner(RunMode::ColdHot).run(&catalog(20), &domain).unwrap();
    let reports: Vec<LabelledReport> = ["small", "medium", "large"]
        .iter()
        .map(|label| LabelledReport {
            label: label.to_string(),
            report: report.clone(),
        })
        .collect();

    group.bench_function("hot_table_3_datasets", |b| {
        b.iter(|| black_box(hot_table(black_box(&reports))))
    });

    group.finish();
}

criterion_group!(benches, bench_runner_overhead, bench_latex);
criterion_main!(benches);
