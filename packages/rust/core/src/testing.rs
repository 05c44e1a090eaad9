//! Test doubles shared by the pipeline and service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use serpcluster_shared::{
    ClusterAssignment, KeywordStore, PipelineConfig, Query, Result, RunRecord, SearchProvider,
    SerpClusterError, StoredKeywordRow,
};

use crate::pipeline::Pipeline;

/// Provider returning a fixed URL list (or always failing), counting calls.
pub(crate) struct StaticProvider {
    urls: Option<Vec<String>>,
    calls: Mutex<usize>,
}

impl StaticProvider {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls: Some(urls),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            urls: None,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SearchProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &Query, max_results: usize) -> Result<Vec<String>> {
        *self.calls.lock().unwrap() += 1;
        match &self.urls {
            Some(urls) => Ok(urls.iter().take(max_results).cloned().collect()),
            None => Err(SerpClusterError::Network("provider unavailable".into())),
        }
    }
}

/// In-memory keyword table.
#[derive(Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<Vec<StoredKeywordRow>>,
    runs: Mutex<Vec<RunRecord>>,
}

impl MemoryStore {
    pub fn rows(&self) -> Vec<StoredKeywordRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

#[async_trait]
impl KeywordStore for MemoryStore {
    async fn append_run(&self, run: &RunRecord, assignment: &ClusterAssignment) -> Result<usize> {
        let new_rows = assignment.rows();
        let written = new_rows.len();
        self.rows.lock().unwrap().extend(new_rows);
        self.runs.lock().unwrap().push(run.clone());
        Ok(written)
    }
}

/// A pipeline allowed to reach the local mock server.
pub(crate) fn pipeline_with<P: SearchProvider + 'static>(
    provider: P,
    store: Arc<MemoryStore>,
    cluster_count: usize,
) -> Pipeline {
    pipeline_with_shared(Arc::new(provider), store, cluster_count)
}

pub(crate) fn pipeline_with_shared(
    provider: Arc<dyn SearchProvider>,
    store: Arc<MemoryStore>,
    cluster_count: usize,
) -> Pipeline {
    let mut config = PipelineConfig::new(cluster_count);
    config.allow_private_hosts = true;
    Pipeline::new(config, provider, store).unwrap()
}

/// Mount an HTML page at `route`.
pub(crate) async fn serve_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("<html><body>{body}</body></html>"),
            "text/html",
        ))
        .mount(server)
        .await;
}

/// Repeat `text` until it is at least `min_len` characters long.
pub(crate) fn page_of_length(text: &str, min_len: usize) -> String {
    let mut page = String::new();
    while page.len() < min_len {
        page.push_str(text);
        page.push(' ');
    }
    page
}
