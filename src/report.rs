//! Report persistence. Writes go through a temp file in the target
//! directory and are renamed into place, so readers never see half a report.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{BenchError, Result};
use crate::schema::{BenchmarkReport, RunMeta};

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(value)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn write_report(path: &Path, report: &BenchmarkReport) -> Result<()> {
    write_json_atomic(path, report)
}

/// `report.json` -> `report.meta.json`.
pub fn meta_path(report_path: &Path) -> PathBuf {
    let stem = report_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    report_path.with_file_name(format!("{stem}.meta.json"))
}

pub fn write_meta(report_path: &Path, meta: &RunMeta) -> Result<PathBuf> {
    let path = meta_path(report_path);
    write_json_atomic(&path, meta)?;
    Ok(path)
}

/// Loads a report of either shape.
pub fn load_report(path: &Path) -> Result<BenchmarkReport> {
    let bytes = fs::read(path)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    if !value.is_array() {
        return Err(BenchError::Report {
            path: path.to_path_buf(),
            reason: "expected a JSON array of query results".to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| BenchError::Report {
        path: path.to_path_buf(),
        reason: format!("entries match neither the plain nor the cold/hot shape ({e})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterBinding;
    use crate::schema::{ColdHotBindingResult, ColdHotQueryResult};
    use tempfile::tempdir;

    fn sample_report() -> BenchmarkReport {
        BenchmarkReport::ColdHot(vec![ColdHotQueryResult {
            query_id: 1,
            query: "MATCH (u:User {user_id: $userId}) RETURN u".to_string(),
            total_params: 1,
            cold_avg_sec: 0.012,
            hot_avg_sec: 0.003,
            per_param_results: vec![ColdHotBindingResult {
                params: ParameterBinding {
                    user_id: 42,
                    region: "US".to_string(),
                },
                cold_time: 0.012,
                hot_times: vec![0.002, 0.004],
                hot_mean: 0.003,
            }],
            failed_params: Vec::new(),
        }])
    }

    #[test]
    fn write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        let report = sample_report();
        write_report(&path, &report).unwrap();
        assert_eq!(load_report(&path).unwrap(), report);
    }

    #[test]
    fn meta_sits_next_to_the_report() {
        assert_eq!(
            meta_path(Path::new("out/benchmark_results_small.json")),
            Path::new("out/benchmark_results_small.meta.json")
        );
    }

    #[test]
    fn non_array_documents_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"query_id": 1}"#).unwrap();
        assert!(matches!(load_report(&path), Err(BenchError::Report { .. })));

        fs::write(&path, r#"[{"query_id": 1, "query": "q"}]"#).unwrap();
        assert!(matches!(load_report(&path), Err(BenchError::Report { .. })));
    }
}
