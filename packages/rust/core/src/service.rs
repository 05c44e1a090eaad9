//! Request/response contract shared by the HTTP front end.
//!
//! `{ "query": "..." }` in, `{ "message", "clusters" }` or `{ "error" }` out.

use serde::{Deserialize, Serialize};

use serpcluster_shared::{ClusterAssignment, Query, Result, SerpClusterError, SkippedPage};

use crate::pipeline::{Pipeline, ProgressReporter};

/// Message returned with every successful scrape.
pub const SUCCESS_MESSAGE: &str = "Scraping & clustering complete";

/// Inbound request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Successful response body.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResponse {
    pub message: String,
    /// Cluster index (as a string key) to keywords.
    pub clusters: ClusterAssignment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_pages: Vec<SkippedPage>,
}

/// Failure response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&SerpClusterError> for ErrorBody {
    fn from(err: &SerpClusterError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Validate `request` and run the pipeline.
///
/// A missing or blank query fails with an input error before the pipeline
/// (and therefore any network call) is touched.
pub async fn scrape(
    pipeline: &Pipeline,
    request: ScrapeRequest,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeResponse> {
    let query = Query::new(request.query.unwrap_or_default())?;
    let report = pipeline.run(&query, progress).await?;

    Ok(ScrapeResponse {
        message: SUCCESS_MESSAGE.to_string(),
        clusters: report.clusters,
        skipped_pages: report.skipped,
    })
}
