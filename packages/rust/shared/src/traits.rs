//! Capability interfaces the pipeline depends on.
//!
//! The orchestrator only sees these contracts; the DuckDuckGo provider and the
//! libSQL store are wired in by the application.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ClusterAssignment, Query, RunRecord};

/// A web search backend that turns a query into candidate page URLs.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Issue one search request and return result URLs in provider order,
    /// at most `max_results` of them.
    async fn search(&self, query: &Query, max_results: usize) -> Result<Vec<String>>;
}

/// Durable, append-only sink for clustered keywords.
#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Append every `(cluster, keyword)` pair of `assignment` together with the
    /// run summary, atomically. Returns the number of keyword rows written.
    async fn append_run(&self, run: &RunRecord, assignment: &ClusterAssignment) -> Result<usize>;
}
