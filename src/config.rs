use std::time::Duration;

use crate::error::{BenchError, Result};
use crate::params::DomainSource;
use crate::runner::RunnerConfig;

/// Everything needed to reach the database.
#[derive(Clone)]
pub struct ConnectionSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    /// `None` uses the server's default database.
    pub database: Option<String>,
    /// Per-probe limit; `None` waits indefinitely.
    pub probe_timeout: Option<Duration>,
    pub fetch_size: usize,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("probe_timeout", &self.probe_timeout)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

impl ConnectionSettings {
    /// Builds settings from optional inputs, failing on the first missing
    /// required value.
    pub fn from_parts(
        uri: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        fn required(value: Option<String>, var: &str) -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(BenchError::config(format!(
                    "missing {var} (set the environment variable or pass the flag)"
                ))),
            }
        }

        Ok(Self {
            uri: required(uri, "NEO4J_URI")?,
            user: required(user, "NEO4J_USER")?,
            password: required(password, "NEO4J_PASSWORD")?,
            database: None,
            probe_timeout: None,
            fetch_size: 500,
        })
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = timeout.filter(|t| !t.is_zero());
        self
    }
}

/// A complete run description, passed explicitly into the runner.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub runner: RunnerConfig,
    pub domain: DomainSource,
    /// Seeds the sampler; explicit domains ignore it.
    pub seed: u64,
}
