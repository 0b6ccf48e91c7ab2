//! Cold/hot latency benchmarks for parametric Cypher queries.
//!
//! The crate sweeps every query of a catalog over an ordered list of user
//! ids, times each execution against a live session, and assembles a JSON
//! report the `render` step turns into LaTeX tables and SVG charts. It also
//! ships the e-commerce dataset generator the queries are written against.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod charts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod harness;
pub mod neo4j;
pub mod params;
pub mod render;
pub mod report;
pub mod runner;
pub mod schema;
pub mod session;

pub use error::{BenchError, ProbeError, Result};

/// How samples are collected and summarized for each binding.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Execute each binding N times and report the mean.
    #[default]
    Plain,
    /// One cold execution, then N hot executions averaged separately.
    ColdHot,
}

/// When the runner (re)acquires its database session.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionPolicy {
    /// One session for the whole run; "cold" means first touch of a parameter.
    #[default]
    PerRun,
    /// A fresh session for every query; also resets connection-level caches.
    PerQuery,
}

/// What a failed probe does to the run.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort on the first failure; no report is written.
    #[default]
    FailFast,
    /// Record the failed binding, leave it out of every mean, keep going.
    SkipAndContinue,
}
