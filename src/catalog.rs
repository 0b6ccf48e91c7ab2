//! Query catalog: parametric Cypher templates read from a CSV export.
//!
//! The file needs an `id` column and a `query` column; any other columns
//! are ignored. Rows with an empty query or missing id are dropped.

use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::error::{BenchError, Result};

/// A catalog row as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub source_id: i64,
    pub text: String,
}

/// A query ready to benchmark, with its dense 1-based id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    pub id: usize,
    pub text: String,
}

/// Processing order applied before ids are assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogOrder {
    /// Keep the file order.
    #[default]
    Listed,
    /// Move the last `n` entries, in their relative order, to the front.
    TailFirst(usize),
}

impl CatalogOrder {
    pub fn apply<T>(&self, entries: &mut [T]) {
        if let CatalogOrder::TailFirst(n) = *self {
            let n = n.min(entries.len());
            entries.rotate_right(n);
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: Option<i64>,
    query: Option<String>,
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let catalog_err = |reason: String| BenchError::Catalog {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| catalog_err(e.to_string()))?;

    let headers = reader.headers().map_err(|e| catalog_err(e.to_string()))?;
    for required in ["id", "query"] {
        if !headers.iter().any(|h| h == required) {
            return Err(catalog_err(format!("missing `{required}` column")));
        }
    }

    let mut entries = Vec::new();
    for (line, row) in reader.deserialize::<CatalogRow>().enumerate() {
        let row = row.map_err(|e| catalog_err(e.to_string()))?;
        match (row.id, row.query) {
            (Some(source_id), Some(text)) if !text.trim().is_empty() => {
                entries.push(CatalogEntry { source_id, text });
            }
            _ => debug!(row = line + 1, "dropping catalog row without id or query"),
        }
    }
    Ok(entries)
}

/// Keeps entries with `source_id > min_id`, applies `order`, then numbers
/// the survivors 1..=N.
pub fn prepare(entries: Vec<CatalogEntry>, min_id: i64, order: CatalogOrder) -> Vec<QueryTemplate> {
    let mut kept: Vec<CatalogEntry> = entries
        .into_iter()
        .filter(|e| e.source_id > min_id)
        .collect();
    order.apply(&mut kept);
    kept.into_iter()
        .enumerate()
        .map(|(idx, e)| QueryTemplate {
            id: idx + 1,
            text: e.text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn entries(ids: &[i64]) -> Vec<CatalogEntry> {
        ids.iter()
            .map(|&id| CatalogEntry {
                source_id: id,
                text: format!("Q{id}"),
            })
            .collect()
    }

    fn texts(templates: &[QueryTemplate]) -> Vec<&str> {
        templates.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn filter_keeps_ids_above_threshold() {
        let t = prepare(entries(&[1, 2, 3, 4, 5, 6]), 3, CatalogOrder::Listed);
        assert_eq!(texts(&t), vec!["Q4", "Q5", "Q6"]);
        let ids: Vec<usize> = t.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn tail_first_moves_last_entries_before_numbering() {
        let t = prepare(entries(&[4, 5, 6, 7, 8]), 3, CatalogOrder::TailFirst(2));
        assert_eq!(texts(&t), vec!["Q7", "Q8", "Q4", "Q5", "Q6"]);
        let ids: Vec<usize> = t.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn tail_first_larger_than_catalog_keeps_order() {
        let mut v = vec![1, 2];
        CatalogOrder::TailFirst(5).apply(&mut v);
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn loads_csv_and_drops_empty_queries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queries.csv");
        fs::write(
            &path,
            "id,description,query\n\
             1,first,\"MATCH (u:User {user_id: $userId}) RETURN u\"\n\
             2,blank,\n\
             ,no id,MATCH (n) RETURN n\n\
             5,last,\"MATCH (p:Product) RETURN p LIMIT 1\"\n",
        )
        .unwrap();

        let loaded = load_catalog(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].source_id, 1);
        assert_eq!(loaded[1].text, "MATCH (p:Product) RETURN p LIMIT 1");
    }

    #[test]
    fn missing_query_column_is_a_catalog_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queries.csv");
        fs::write(&path, "id,text\n1,MATCH (n) RETURN n\n").unwrap();
        assert!(matches!(
            load_catalog(&path),
            Err(BenchError::Catalog { .. })
        ));
    }
}
