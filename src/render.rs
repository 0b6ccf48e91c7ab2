//! Turns labelled reports into LaTeX tables and charts.
//!
//! Works from the report documents alone; plain and cold/hot reports can be
//! mixed. For plain reports the overall mean stands in for the hot column.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::charts::render_charts;
use crate::error::{BenchError, Result};
use crate::report::load_report;
use crate::schema::{BenchmarkReport, QuerySummary};

/// A report plus the dataset label it is shown under (e.g. `small`).
#[derive(Debug, Clone)]
pub struct LabelledReport {
    pub label: String,
    pub report: BenchmarkReport,
}

/// Parses `label=path`; a bare path is labelled by its file stem.
pub fn parse_labelled_input(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => {
            Ok((label.to_string(), PathBuf::from(path)))
        }
        Some(_) => Err(format!("expected label=path, got {s:?}")),
        None => {
            let path = PathBuf::from(s);
            let label = path
                .file_stem()
                .and_then(|x| x.to_str())
                .ok_or_else(|| format!("cannot derive a label from {s:?}"))?
                .to_string();
            Ok((label, path))
        }
    }
}

pub fn load_labelled(inputs: &[(String, PathBuf)]) -> Result<Vec<LabelledReport>> {
    inputs
        .iter()
        .map(|(label, path)| {
            let report = load_report(path)?;
            info!(label = %label, path = %path.display(), queries = report.len(), "loaded report");
            Ok(LabelledReport {
                label: label.clone(),
                report,
            })
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Column {
    Cold,
    Hot,
}

fn latex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn latex_table(reports: &[LabelledReport], column: Column) -> String {
    let summaries: Vec<Vec<QuerySummary>> = reports.iter().map(|r| r.report.summaries()).collect();
    let query_ids: BTreeSet<usize> = summaries
        .iter()
        .flat_map(|s| s.iter().map(|q| q.query_id))
        .collect();
    let (tag, caption, label) = match column {
        Column::Hot => (
            "hot",
            "Hot execution time comparison across datasets.",
            "tab:hot_comparison",
        ),
        Column::Cold => (
            "cold",
            "Cold execution time comparison across datasets.",
            "tab:cold_comparison",
        ),
    };

    let mut lines = vec![
        "\\begin{table}[h!]".to_string(),
        "\\centering".to_string(),
        format!("\\begin{{tabular}}{{|c|{}}}", "c|".repeat(reports.len())),
        "\\hline".to_string(),
    ];

    let mut header = vec!["\\textbf{Query ID}".to_string()];
    for r in reports {
        let mut name = latex_escape(&r.label);
        if let Some(first) = name.get(..1) {
            name = format!("{}{}", first.to_uppercase(), &name[1..]);
        }
        header.push(format!("\\textbf{{{name} ({tag})}}"));
    }
    lines.push(format!("{}\\\\", header.join(" & ")));
    lines.push("\\hline".to_string());

    for qid in &query_ids {
        let mut cells = vec![qid.to_string()];
        for s in &summaries {
            let value = s.iter().find(|q| q.query_id == *qid).and_then(|q| match column {
                Column::Hot => Some(q.hot_avg_sec),
                Column::Cold => q.cold_avg_sec,
            });
            cells.push(match value {
                Some(v) => format!("{v:.4}"),
                None => "--".to_string(),
            });
        }
        lines.push(format!("{}\\\\", cells.join(" & ")));
        lines.push("\\hline".to_string());
    }

    lines.push("\\end{tabular}".to_string());
    lines.push(format!("\\caption{{{caption}}}"));
    lines.push(format!("\\label{{{label}}}"));
    lines.push("\\end{table}".to_string());
    lines.join("\n")
}

/// Hot (or plain-mean) seconds per query, one column per dataset.
pub fn hot_table(reports: &[LabelledReport]) -> String {
    latex_table(reports, Column::Hot)
}

/// Cold seconds per query; plain reports show `--`.
pub fn cold_table(reports: &[LabelledReport]) -> String {
    latex_table(reports, Column::Cold)
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    dataset: &'a str,
    query_id: usize,
    cold_avg_sec: Option<f64>,
    hot_avg_sec: f64,
}

#[derive(Serialize)]
struct PointRow<'a> {
    dataset: &'a str,
    query_id: usize,
    user_id: i64,
    region: &'a str,
    cold_time: Option<f64>,
    hot_mean: f64,
}

pub fn write_summary_csv(path: &Path, reports: &[LabelledReport]) -> Result<()> {
    let mut w = WriterBuilder::new().from_path(path)?;
    for r in reports {
        for q in r.report.summaries() {
            w.serialize(SummaryRow {
                dataset: &r.label,
                query_id: q.query_id,
                cold_avg_sec: q.cold_avg_sec,
                hot_avg_sec: q.hot_avg_sec,
            })?;
        }
    }
    w.flush()?;
    Ok(())
}

pub fn write_per_param_csv(path: &Path, reports: &[LabelledReport]) -> Result<()> {
    let mut w = WriterBuilder::new().from_path(path)?;
    for r in reports {
        for p in r.report.binding_points() {
            w.serialize(PointRow {
                dataset: &r.label,
                query_id: p.query_id,
                user_id: p.params.user_id,
                region: &p.params.region,
                cold_time: p.cold_time,
                hot_mean: p.hot_mean,
            })?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Writes every artifact into `out_dir` and returns the paths written.
pub fn render_all(reports: &[LabelledReport], out_dir: &Path) -> Result<Vec<PathBuf>> {
    if reports.is_empty() {
        return Err(BenchError::config("render needs at least one input report"));
    }
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let hot = out_dir.join("latex_table_hot.tex");
    fs::write(&hot, hot_table(reports))?;
    written.push(hot);

    let any_cold = reports
        .iter()
        .any(|r| matches!(r.report, BenchmarkReport::ColdHot(_)));
    if any_cold {
        let cold = out_dir.join("latex_table_cold.tex");
        fs::write(&cold, cold_table(reports))?;
        written.push(cold);
    }

    let summary = out_dir.join("summary.csv");
    write_summary_csv(&summary, reports)?;
    written.push(summary);

    let points = out_dir.join("per_param.csv");
    write_per_param_csv(&points, reports)?;
    written.push(points);

    written.extend(render_charts(reports, out_dir)?);

    for path in &written {
        info!(path = %path.display(), "saved");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterBinding;
    use crate::schema::{
        ColdHotBindingResult, ColdHotQueryResult, PlainBindingResult, PlainQueryResult,
    };
    use tempfile::tempdir;

    fn binding(id: i64) -> ParameterBinding {
        ParameterBinding {
            user_id: id,
            region: "EU".to_string(),
        }
    }

    fn cold_hot(label: &str, values: &[(f64, f64)]) -> LabelledReport {
        let queries = values
            .iter()
            .enumerate()
            .map(|(i, &(cold, hot))| ColdHotQueryResult {
                query_id: i + 1,
                query: format!("Q{}", i + 1),
                total_params: 1,
                cold_avg_sec: cold,
                hot_avg_sec: hot,
                per_param_results: vec![ColdHotBindingResult {
                    params: binding(5),
                    cold_time: cold,
                    hot_times: vec![hot],
                    hot_mean: hot,
                }],
                failed_params: Vec::new(),
            })
            .collect();
        LabelledReport {
            label: label.to_string(),
            report: BenchmarkReport::ColdHot(queries),
        }
    }

    fn plain(label: &str, means: &[f64]) -> LabelledReport {
        let queries = means
            .iter()
            .enumerate()
            .map(|(i, &m)| PlainQueryResult {
                query_id: i + 1,
                query: format!("Q{}", i + 1),
                runs_per_query: 1,
                parameter_count: 1,
                overall_mean_sec: m,
                per_param_results: vec![PlainBindingResult {
                    params: binding(5),
                    runs: vec![m],
                    mean: m,
                }],
                failed_params: Vec::new(),
            })
            .collect();
        LabelledReport {
            label: label.to_string(),
            report: BenchmarkReport::Plain(queries),
        }
    }

    #[test]
    fn labelled_inputs_parse() {
        assert_eq!(
            parse_labelled_input("small=out/a.json").unwrap(),
            ("small".to_string(), PathBuf::from("out/a.json"))
        );
        assert_eq!(
            parse_labelled_input("out/benchmark_results_large.json").unwrap().0,
            "benchmark_results_large"
        );
        assert!(parse_labelled_input("=x.json").is_err());
    }

    #[test]
    fn hot_table_has_one_row_per_query_and_dash_for_gaps() {
        let reports = vec![
            cold_hot("small", &[(0.5, 0.01234), (0.6, 0.02)]),
            cold_hot("medium", &[(0.7, 0.03)]),
        ];
        let tex = hot_table(&reports);
        assert!(tex.starts_with("\\begin{table}[h!]"));
        assert!(tex.contains("\\begin{tabular}{|c|c|c|}"));
        assert!(tex.contains("\\textbf{Query ID} & \\textbf{Small (hot)} & \\textbf{Medium (hot)}\\\\"));
        assert!(tex.contains("1 & 0.0123 & 0.0300\\\\"));
        assert!(tex.contains("2 & 0.0200 & --\\\\"));
        assert!(tex.contains("\\label{tab:hot_comparison}"));
    }

    #[test]
    fn cold_table_dashes_plain_inputs() {
        let reports = vec![cold_hot("small", &[(0.5, 0.1)]), plain("large", &[0.2])];
        let tex = cold_table(&reports);
        assert!(tex.contains("1 & 0.5000 & --\\\\"));
        assert!(hot_table(&reports).contains("1 & 0.1000 & 0.2000\\\\"));
    }

    #[test]
    fn labels_are_escaped() {
        let tex = hot_table(&[plain("run_a", &[0.1])]);
        assert!(tex.contains("Run\\_a (hot)"));
    }

    #[test]
    fn render_all_writes_expected_artifacts() {
        let dir = tempdir().unwrap();
        let reports = vec![cold_hot("small", &[(0.5, 0.1)]), plain("medium", &[0.2])];
        let written = render_all(&reports, dir.path()).unwrap();
        for name in [
            "latex_table_hot.tex",
            "latex_table_cold.tex",
            "summary.csv",
            "per_param.csv",
            "small_query_1_cold_vs_hot_bar.svg",
            "small_query_1_cold_vs_hot_scatter.svg",
            "all_hot_exec_comparison.svg",
            "hot_all_sizes_bar.svg",
            "all_cold_exec_comparison.svg",
            "cold_all_sizes_bar.svg",
        ] {
            let path = dir.path().join(name);
            assert!(written.contains(&path), "{name} not reported");
            assert!(path.is_file(), "{name} not written");
        }
        assert_eq!(written.len(), 10);
        assert!(!dir.path().join("medium_query_1_cold_vs_hot_bar.svg").exists());

        let svg = fs::read_to_string(dir.path().join("all_hot_exec_comparison.svg")).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("small (hot)"));
        assert!(svg.contains("medium (hot)"));

        let summary = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        let mut lines = summary.lines();
        assert_eq!(
            lines.next(),
            Some("dataset,query_id,cold_avg_sec,hot_avg_sec")
        );
        assert_eq!(lines.next(), Some("small,1,0.5,0.1"));
        assert_eq!(lines.next(), Some("medium,1,,0.2"));

        let points = fs::read_to_string(dir.path().join("per_param.csv")).unwrap();
        assert!(points.starts_with("dataset,query_id,user_id,region,cold_time,hot_mean\n"));
        assert!(points.contains("small,1,5,EU,0.5,0.1"));
    }

    #[test]
    fn plain_only_inputs_skip_the_cold_table() {
        let dir = tempdir().unwrap();
        let written = render_all(&[plain("small", &[0.2])], dir.path()).unwrap();
        assert_eq!(written.len(), 5);
        assert!(!dir.path().join("latex_table_cold.tex").exists());
        assert!(!dir.path().join("all_cold_exec_comparison.svg").exists());
        assert!(dir.path().join("hot_all_sizes_bar.svg").is_file());
    }
}
