use clap::{Parser, Subcommand};
use cypher_latency_bench::catalog::{self, CatalogOrder};
use cypher_latency_bench::config::{ConnectionSettings, RunConfig};
use cypher_latency_bench::dataset::{self, GenerateConfig, Scale};
use cypher_latency_bench::neo4j::Neo4jConnector;
use cypher_latency_bench::params::{
    parse_user_ids, DomainSource, PopulationSource, DEFAULT_POPULATION_QUERY, DEFAULT_REGIONS,
};
use cypher_latency_bench::render;
use cypher_latency_bench::report;
use cypher_latency_bench::runner::{self, RunnerConfig};
use cypher_latency_bench::schema::{RunMeta, SCHEMA_VERSION};
use cypher_latency_bench::{ConnectionPolicy, FailurePolicy, Result, RunMode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep every catalog query over the parameter domain against a live database.
    Run {
        #[arg(long, env = "NEO4J_URI")]
        uri: Option<String>,

        #[arg(long, env = "NEO4J_USER")]
        user: Option<String>,

        #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Database name; the server default when omitted.
        #[arg(long, env = "NEO4J_DATABASE")]
        database: Option<String>,

        /// CSV with `id` and `query` columns.
        #[arg(long, env = "QUERY_FILE", value_name = "FILE")]
        queries: PathBuf,

        /// Where to write the JSON report. If omitted, prints to stdout.
        #[arg(long, env = "OUTPUT_JSON", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Only rows with `id` greater than this are benchmarked.
        #[arg(long, env = "MIN_QUERY_ID", default_value_t = 3)]
        min_query_id: i64,

        /// Move the last N catalog entries to the front before numbering.
        #[arg(long, value_name = "N")]
        tail_first: Option<usize>,

        #[arg(long, env = "BENCH_MODE", value_enum, default_value_t = RunMode::Plain)]
        mode: RunMode,

        /// Timed executions per binding (hot executions in cold-hot mode).
        #[arg(long, env = "RUNS_PER_QUERY", default_value_t = 5)]
        runs: usize,

        /// Explicit user ids: `1,2,3`, `1..=500`, or `1..500`.
        #[arg(long, env = "USER_IDS", value_parser = parse_user_id_list, conflicts_with = "sample")]
        user_ids: Option<UserIds>,

        /// Sample K distinct user ids instead of an explicit list.
        #[arg(long, env = "SAMPLE_SIZE", value_name = "K")]
        sample: Option<usize>,

        /// Population for `--sample`: this query (must return `id`)...
        #[arg(long, default_value = DEFAULT_POPULATION_QUERY)]
        population_query: String,

        /// ...or an id column of a generated dataset table.
        #[arg(long, value_name = "FILE")]
        population_file: Option<PathBuf>,

        #[arg(long, default_value = "user_id")]
        population_column: String,

        /// Region labels, assigned as regions[userId mod len].
        #[arg(long, env = "REGIONS", value_delimiter = ',')]
        regions: Option<Vec<String>>,

        #[arg(long, value_enum, default_value_t = ConnectionPolicy::PerRun)]
        connection: ConnectionPolicy,

        #[arg(long, value_enum, default_value_t = FailurePolicy::FailFast)]
        on_failure: FailurePolicy,

        /// Per-probe timeout in milliseconds; 0 disables it.
        #[arg(long, env = "PROBE_TIMEOUT_MS", default_value_t = 0)]
        probe_timeout_ms: u64,
    },

    /// Generate the synthetic e-commerce dataset as CSV files.
    GenerateDataset {
        /// Which preset to generate; `all` runs small, medium, and large.
        #[arg(long, default_value = "all", value_parser = parse_scales)]
        scale: ScaleSelection,

        /// Root directory; each scale lands in `dataset_<scale>/`.
        #[arg(long, short = 'o', value_name = "DIR", default_value = "neo4j_import")]
        output: PathBuf,

        /// Orders and wishlists fall in this year.
        #[arg(long, default_value_t = 2025)]
        anchor_year: i32,
    },

    /// Show the manifest of a generated dataset.
    DatasetInfo {
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Re-hash every table and fail on mismatch.
        #[arg(long, default_value_t = false)]
        verify: bool,
    },

    /// Render LaTeX tables and chart data from one or more reports.
    Render {
        /// `label=path` (e.g. `small=benchmark_results_small.json`). Repeatable.
        #[arg(short, long = "input", value_name = "LABEL=PATH", required = true, num_args = 1.., action = clap::ArgAction::Append, value_parser = render::parse_labelled_input)]
        inputs: Vec<(String, PathBuf)>,

        #[arg(long, value_name = "DIR", default_value = "plots_combined")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Debug)]
struct ScaleSelection(Vec<Scale>);

#[derive(Clone, Debug)]
struct UserIds(Vec<i64>);

fn parse_user_id_list(s: &str) -> std::result::Result<UserIds, String> {
    parse_user_ids(s).map(UserIds)
}

fn parse_scales(s: &str) -> std::result::Result<ScaleSelection, String> {
    use clap::ValueEnum;
    if s.eq_ignore_ascii_case("all") {
        return Ok(ScaleSelection(Scale::ALL.to_vec()));
    }
    Scale::from_str(s, true)
        .map(|scale| ScaleSelection(vec![scale]))
        .map_err(|_| format!("unknown scale {s:?} (small|medium|large|all)"))
}

#[derive(Parser, Debug)]
#[command(name = "cypher-latency-bench")]
#[command(about = "Cold/hot Cypher latency benchmark runner (JSON output)")]
struct Args {
    /// Seeds parameter sampling and dataset generation.
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    #[command(subcommand)]
    cmd: Command,
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: Args) -> Result<()> {
    match args.cmd {
        Command::Run {
            uri,
            user,
            password,
            database,
            queries,
            out,
            min_query_id,
            tail_first,
            mode,
            runs,
            user_ids,
            sample,
            population_query,
            population_file,
            population_column,
            regions,
            connection,
            on_failure,
            probe_timeout_ms,
        } => {
            let settings = ConnectionSettings::from_parts(uri, user, password)?
                .with_database(database)
                .with_probe_timeout(Some(Duration::from_millis(probe_timeout_ms)));

            let domain = match (user_ids, sample) {
                (_, Some(size)) => DomainSource::Sample {
                    size,
                    population: match population_file {
                        Some(path) => PopulationSource::File {
                            path,
                            column: population_column,
                        },
                        None => PopulationSource::Database {
                            query: population_query,
                        },
                    },
                },
                (Some(UserIds(ids)), None) => DomainSource::Explicit(ids),
                (None, None) => DomainSource::default(),
            };
            let regions = regions
                .unwrap_or_else(|| DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect());
            let config = RunConfig {
                runner: RunnerConfig {
                    mode,
                    runs_per_binding: runs,
                    regions,
                    connection,
                    failure: on_failure,
                },
                domain,
                seed: args.seed,
            };
            config.runner.validate()?;

            let order = match tail_first {
                Some(n) => CatalogOrder::TailFirst(n),
                None => CatalogOrder::Listed,
            };
            let catalog = catalog::prepare(catalog::load_catalog(&queries)?, min_query_id, order);
            info!(
                queries = catalog.len(),
                file = %queries.display(),
                min_query_id,
                "catalog loaded"
            );

            let connector = Neo4jConnector::new(settings);
            let endpoint = connector.settings().uri.clone();
            let started = Instant::now();
            let report = runner::execute(&config, &catalog, connector, out.as_deref())?;
            info!(elapsed_s = started.elapsed().as_secs_f64(), "benchmark complete");

            match &out {
                Some(out) => {
                    let meta = RunMeta {
                        schema_version: SCHEMA_VERSION,
                        bench_version: env!("CARGO_PKG_VERSION").to_string(),
                        mode,
                        runs_per_binding: runs,
                        connection_policy: connection,
                        failure_policy: on_failure,
                        seed: args.seed,
                        endpoint,
                        timestamp_utc: chrono::Utc::now().to_rfc3339(),
                        git_sha: git_sha_short(),
                    };
                    let meta_path = report::write_meta(out, &meta)?;
                    info!(path = %meta_path.display(), "run metadata written");
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Command::GenerateDataset {
            scale,
            output,
            anchor_year,
        } => {
            for scale in scale.0 {
                let cfg = GenerateConfig {
                    scale,
                    seed: args.seed,
                    anchor_year,
                    counts: None,
                };
                let counts = cfg.counts();
                info!(
                    scale = scale.as_str(),
                    users = counts.users,
                    products = counts.products,
                    orders = counts.orders,
                    "generating dataset"
                );
                let start = Instant::now();
                let (dir, manifest) = dataset::write_dataset(&output, &cfg)?;
                info!(
                    scale = scale.as_str(),
                    dir = %dir.display(),
                    tables = manifest.tables.len(),
                    elapsed_s = start.elapsed().as_secs_f64(),
                    "dataset written"
                );
            }
        }

        Command::DatasetInfo { path, verify } => {
            let manifest = if verify {
                dataset::verify_dataset(&path)?
            } else {
                dataset::read_manifest(&path)?
            };
            eprintln!("Dataset: {}", path.display());
            eprintln!("  Scale: {}", manifest.scale.as_str());
            eprintln!("  Seed: {}", manifest.seed);
            eprintln!("  Anchor year: {}", manifest.anchor_year);
            eprintln!("  Generator: {}", manifest.generator_version);
            for t in &manifest.tables {
                eprintln!("  {:<16} {:>8} rows  sha256 {}", t.file, t.rows, t.sha256);
            }
            if verify {
                eprintln!("  All tables verified.");
            }
        }

        Command::Render { inputs, output_dir } => {
            let reports = render::load_labelled(&inputs)?;
            render::render_all(&reports, &output_dir)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn report_path_belongs_to_run_only() {
        let args = Args::try_parse_from([
            "cypher-latency-bench",
            "run",
            "--queries",
            "queries.csv",
            "--out",
            "results.json",
        ])
        .unwrap();
        match args.cmd {
            Command::Run { out, .. } => assert_eq!(out, Some(PathBuf::from("results.json"))),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Args::try_parse_from(["cypher-latency-bench", "generate-dataset"]).is_ok());
        assert!(
            Args::try_parse_from(["cypher-latency-bench", "generate-dataset", "--out", "x.json"])
                .is_err()
        );
        assert!(Args::try_parse_from(["cypher-latency-bench", "render", "-i", "a.json"]).is_ok());
        assert!(Args::try_parse_from([
            "cypher-latency-bench",
            "render",
            "-i",
            "a.json",
            "--out",
            "x.json"
        ])
        .is_err());
    }
}
