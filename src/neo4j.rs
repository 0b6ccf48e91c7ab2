//! Neo4j sessions over Bolt, driven by `neo4rs`.
//!
//! Each session owns a current-thread tokio runtime and blocks on every call,
//! so probes run strictly one after another. The driver pool is capped at a
//! single connection so a session maps to exactly one server connection.

use std::future::Future;
use std::time::Duration;

use neo4rs::{query, ConfigBuilder, Graph};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::config::ConnectionSettings;
use crate::error::{BenchError, ProbeError, Result};
use crate::params::ParameterBinding;
use crate::session::{Connector, QuerySession};

pub struct Neo4jConnector {
    settings: ConnectionSettings,
}

impl Neo4jConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn connection_err(&self, source: impl Into<crate::error::DriverError>) -> BenchError {
        BenchError::Connection {
            uri: self.settings.uri.clone(),
            source: source.into(),
        }
    }
}

impl Connector for Neo4jConnector {
    type Session = Neo4jSession;

    fn endpoint(&self) -> &str {
        &self.settings.uri
    }

    fn connect(&self) -> Result<Neo4jSession> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| self.connection_err(e))?;

        let mut builder = ConfigBuilder::default()
            .uri(self.settings.uri.as_str())
            .user(self.settings.user.as_str())
            .password(self.settings.password.as_str())
            .fetch_size(self.settings.fetch_size)
            .max_connections(1);
        if let Some(db) = &self.settings.database {
            builder = builder.db(db.as_str());
        }
        let config = builder.build().map_err(|e| self.connection_err(e))?;

        let graph = runtime
            .block_on(Graph::connect(config))
            .map_err(|e| self.connection_err(e))?;
        debug!(uri = %self.settings.uri, "session opened");

        Ok(Neo4jSession {
            graph,
            timeout: self.settings.probe_timeout,
            runtime,
        })
    }
}

/// A single Bolt connection plus the runtime that drives it.
///
/// A timed-out query is abandoned mid-stream; the session stays usable but
/// the server may still be finishing the old request.
pub struct Neo4jSession {
    graph: Graph,
    timeout: Option<Duration>,
    runtime: Runtime,
}

/// Drives `fut` to completion on `runtime`, giving up after `limit`.
///
/// Expiry surfaces as [`ProbeError::Timeout`] and goes through the same
/// failure policy as a driver error.
pub fn run_limited<T, F>(
    runtime: &Runtime,
    limit: Option<Duration>,
    fut: F,
) -> std::result::Result<T, ProbeError>
where
    F: Future<Output = std::result::Result<T, ProbeError>>,
{
    match limit {
        Some(limit) => runtime.block_on(async {
            tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ProbeError::Timeout(limit))?
        }),
        None => runtime.block_on(fut),
    }
}

impl QuerySession for Neo4jSession {
    fn run_to_completion(
        &mut self,
        text: &str,
        binding: &ParameterBinding,
    ) -> std::result::Result<(), ProbeError> {
        let q = query(text)
            .param("userId", binding.user_id)
            .param("region", binding.region.clone());
        let graph = &self.graph;
        run_limited(&self.runtime, self.timeout, async move {
            let mut rows = graph.execute(q).await.map_err(ProbeError::driver)?;
            while rows.next().await.map_err(ProbeError::driver)?.is_some() {}
            Ok(())
        })
    }

    fn fetch_ids(&mut self, text: &str) -> std::result::Result<Vec<i64>, ProbeError> {
        let graph = &self.graph;
        run_limited(&self.runtime, self.timeout, async move {
            let mut rows = graph.execute(query(text)).await.map_err(ProbeError::driver)?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next().await.map_err(ProbeError::driver)? {
                let id: i64 = row.get("id").map_err(ProbeError::driver)?;
                ids.push(id);
            }
            Ok(ids)
        })
    }
}

impl Drop for Neo4jSession {
    fn drop(&mut self) {
        debug!("session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        Builder::new_current_thread().enable_all().build().unwrap()
    }

    #[test]
    fn expired_limit_is_a_timeout() {
        let rt = runtime();
        let limit = Duration::from_millis(20);
        let err = run_limited(&rt, Some(limit), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), ProbeError>(())
        })
        .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(d) if d == limit));
        assert!(err.to_string().contains("did not complete"));
    }

    #[test]
    fn fast_futures_finish_under_the_limit() {
        let rt = runtime();
        let value = run_limited(&rt, Some(Duration::from_secs(5)), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok::<u32, ProbeError>(7)
        })
        .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn no_limit_waits_and_keeps_driver_errors() {
        let rt = runtime();
        let err = run_limited(&rt, None, async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<(), ProbeError>(ProbeError::driver("syntax error"))
        })
        .unwrap_err();
        assert!(matches!(err, ProbeError::Driver(_)));
    }
}
