//! Parameter domain: the ordered user ids every query is swept over, and the
//! bindings derived from them.

use std::fmt;
use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset;
use crate::error::{BenchError, Result};
use crate::session::{Connector, QuerySession};

/// Default population query for random sampling.
pub const DEFAULT_POPULATION_QUERY: &str = "MATCH (u:User) RETURN u.user_id AS id";

/// Region labels used when none are configured.
pub const DEFAULT_REGIONS: [&str; 5] = ["EU", "US", "ASIA", "AFRICA", "LATAM"];

/// Bound parameters for one sweep step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBinding {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub region: String,
}

impl ParameterBinding {
    /// Pairs `user_id` with `regions[user_id mod len(regions)]`.
    ///
    /// `regions` must not be empty.
    pub fn new(user_id: i64, regions: &[String]) -> Self {
        let idx = user_id.rem_euclid(regions.len() as i64) as usize;
        Self {
            user_id,
            region: regions[idx].clone(),
        }
    }
}

impl fmt::Display for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{userId: {}, region: {:?}}}", self.user_id, self.region)
    }
}

/// Builds the sweep bindings in domain order.
pub fn bindings(domain: &[i64], regions: &[String]) -> Result<Vec<ParameterBinding>> {
    if regions.is_empty() {
        return Err(BenchError::config("at least one region is required"));
    }
    Ok(domain
        .iter()
        .map(|&id| ParameterBinding::new(id, regions))
        .collect())
}

/// Where a sampled population comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulationSource {
    /// Ask the live database; the query must return an integer column `id`.
    Database { query: String },
    /// Read an integer id column from a generated dataset table.
    File { path: PathBuf, column: String },
}

/// How the primary parameter values are obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainSource {
    Explicit(Vec<i64>),
    Sample {
        size: usize,
        population: PopulationSource,
    },
}

impl Default for DomainSource {
    fn default() -> Self {
        DomainSource::Explicit((1..=500).collect())
    }
}

/// Parses `1,2,3`, `1..=500`, or `1..500`.
pub fn parse_user_ids(s: &str) -> std::result::Result<Vec<i64>, String> {
    let s = s.trim();
    if let Some((lo, hi)) = s.split_once("..") {
        let (inclusive, hi) = match hi.strip_prefix('=') {
            Some(rest) => (true, rest),
            None => (false, hi),
        };
        let lo: i64 = lo.trim().parse().map_err(|e| format!("bad range start {lo:?}: {e}"))?;
        let hi: i64 = hi.trim().parse().map_err(|e| format!("bad range end {hi:?}: {e}"))?;
        let ids: Vec<i64> = if inclusive {
            (lo..=hi).collect()
        } else {
            (lo..hi).collect()
        };
        if ids.is_empty() {
            return Err(format!("range {s} is empty"));
        }
        return Ok(ids);
    }

    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|e| format!("bad user id {part:?}: {e}"))
        })
        .collect()
}

/// Draws `k` distinct ids uniformly without replacement.
///
/// Duplicate ids in `population` are collapsed first, so the result never
/// repeats a value.
pub fn sample_without_replacement<R: Rng + ?Sized>(
    mut population: Vec<i64>,
    k: usize,
    rng: &mut R,
) -> Result<Vec<i64>> {
    population.sort_unstable();
    population.dedup();
    if k > population.len() {
        return Err(BenchError::Sampling {
            requested: k,
            available: population.len(),
        });
    }
    Ok(population.choose_multiple(rng, k).copied().collect())
}

/// Resolves the domain before any probe runs.
///
/// Database populations are fetched over a short-lived session that is
/// dropped before measurement starts.
pub fn resolve_domain<C, R>(source: &DomainSource, connector: &C, rng: &mut R) -> Result<Vec<i64>>
where
    C: Connector,
    R: Rng + ?Sized,
{
    let domain = match source {
        DomainSource::Explicit(ids) => {
            if ids.is_empty() {
                return Err(BenchError::config("the parameter domain is empty"));
            }
            let mut seen = ids.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != ids.len() {
                warn!(
                    duplicates = ids.len() - seen.len(),
                    "explicit user ids contain repeats; repeated ids are swept again"
                );
            }
            ids.clone()
        }
        DomainSource::Sample { size, population } => {
            if *size == 0 {
                return Err(BenchError::config("sample size must be at least 1"));
            }
            let ids = match population {
                PopulationSource::Database { query } => {
                    let mut session = connector.connect()?;
                    session
                        .fetch_ids(query)
                        .map_err(BenchError::PopulationQuery)?
                }
                PopulationSource::File { path, column } => dataset::read_id_column(path, column)?,
            };
            let population_size = ids.len();
            let sampled = sample_without_replacement(ids, *size, rng)?;
            info!(
                sampled = sampled.len(),
                population = population_size,
                "sampled parameter domain"
            );
            sampled
        }
    };
    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn regions(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn region_is_derived_from_user_id() {
        let r = regions(&["EU", "US"]);
        assert_eq!(ParameterBinding::new(7, &r).region, "US");
        assert_eq!(ParameterBinding::new(8, &r).region, "EU");

        let r5 = regions(&DEFAULT_REGIONS);
        for id in 0..50 {
            let b = ParameterBinding::new(id, &r5);
            assert_eq!(b.region, DEFAULT_REGIONS[(id % 5) as usize]);
        }
    }

    #[test]
    fn negative_ids_still_map_to_a_region() {
        let r = regions(&["EU", "US", "ASIA"]);
        assert_eq!(ParameterBinding::new(-1, &r).region, "ASIA");
    }

    #[test]
    fn bindings_keep_domain_order() {
        let r = regions(&["EU", "US"]);
        let b = bindings(&[13, 7, 2], &r).unwrap();
        let ids: Vec<i64> = b.iter().map(|x| x.user_id).collect();
        assert_eq!(ids, vec![13, 7, 2]);
    }

    #[test]
    fn bindings_reject_empty_regions() {
        assert!(matches!(
            bindings(&[1], &[]),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn binding_serializes_with_camel_case_user_id() {
        let b = ParameterBinding::new(7, &regions(&["EU", "US"]));
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v, serde_json::json!({"userId": 7, "region": "US"}));
    }

    #[test]
    fn parses_lists_and_ranges() {
        assert_eq!(parse_user_ids("7,13").unwrap(), vec![7, 13]);
        assert_eq!(parse_user_ids(" 1..=3 ").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_user_ids("1..3").unwrap(), vec![1, 2]);
        assert!(parse_user_ids("3..1").is_err());
        assert!(parse_user_ids("1,x").is_err());
    }

    #[test]
    fn sampling_has_no_duplicates_and_exact_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let population: Vec<i64> = (0..400).chain(0..100).collect();
        let sample = sample_without_replacement(population, 50, &mut rng).unwrap();
        assert_eq!(sample.len(), 50);
        let unique: HashSet<i64> = sample.iter().copied().collect();
        assert_eq!(unique.len(), 50);
        assert!(sample.iter().all(|id| (0..400).contains(id)));
    }

    #[test]
    fn sampling_is_seeded() {
        let population: Vec<i64> = (0..1_000).collect();
        let a = sample_without_replacement(
            population.clone(),
            20,
            &mut ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();
        let b = sample_without_replacement(population, 20, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn oversized_sample_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = sample_without_replacement((0..5).collect(), 10, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Sampling {
                requested: 10,
                available: 5
            }
        ));
    }
}
