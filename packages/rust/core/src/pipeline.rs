//! End-to-end run: query → result URLs → page texts → keyword set → clusters → storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use serpcluster_loader::PageLoader;
use serpcluster_shared::{
    ClusterAssignment, KeywordSet, KeywordStore, PageContent, PipelineConfig, Query, Result,
    RunId, RunRecord, SearchProvider, SerpClusterError, SkippedPage,
};

/// Stages of a single run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fetching,
    Loading,
    Extracting,
    Clustering,
    Storing,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fetching => "Searching",
            Self::Loading => "Loading pages",
            Self::Extracting => "Extracting keywords",
            Self::Clustering => "Clustering keywords",
            Self::Storing => "Storing clusters",
        })
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub query: Query,
    pub clusters: ClusterAssignment,
    /// Pages whose text contributed keywords.
    pub pages_used: usize,
    /// Pages excluded from aggregation, with the reason.
    pub skipped: Vec<SkippedPage>,
    pub keyword_count: usize,
    pub rows_stored: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, phase: RunPhase);
    /// Called after each page load, usable or not.
    fn page_loaded(&self, page: &PageContent, current: usize, total: usize);
    /// Called when the run completes successfully.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _phase: RunPhase) {}
    fn page_loaded(&self, _page: &PageContent, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The keyword clustering pipeline, wired to a search provider and a store.
///
/// One `Pipeline` can serve many runs, concurrently if needed. Runs share
/// nothing but the store.
pub struct Pipeline {
    config: PipelineConfig,
    provider: Arc<dyn SearchProvider>,
    loader: PageLoader,
    store: Arc<dyn KeywordStore>,
}

impl Pipeline {
    /// Validate `config` and build the page loader.
    pub fn new(
        config: PipelineConfig,
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn KeywordStore>,
    ) -> Result<Self> {
        config.validate()?;
        let loader = PageLoader::new(&config)?;
        Ok(Self {
            config,
            provider,
            loader,
            store,
        })
    }

    /// Run the pipeline for one query.
    ///
    /// Fails with [`SerpClusterError::NoResults`] when the search yields no
    /// URLs and with [`SerpClusterError::Clustering`] when the aggregated
    /// keywords cannot be clustered. Nothing is stored in either case.
    /// Individual page failures are reported in [`RunReport::skipped`].
    #[instrument(skip_all, fields(query = %query, run_id = tracing::field::Empty))]
    pub async fn run(&self, query: &Query, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = RunId::new();
        tracing::Span::current().record("run_id", tracing::field::display(&run_id));

        info!(provider = self.provider.name(), "starting run");

        // --- Fetching ---
        progress.phase(RunPhase::Fetching);
        let urls = serpcluster_search::fetch_result_urls(
            self.provider.as_ref(),
            query,
            self.config.max_results,
        )
        .await;

        if urls.is_empty() {
            warn!("search returned no links");
            return Err(SerpClusterError::NoResults);
        }

        // --- Loading ---
        progress.phase(RunPhase::Loading);
        let total = urls.len();
        let mut pages = Vec::with_capacity(total);
        for (i, url) in urls.iter().enumerate() {
            let page = self.loader.load(url).await;
            progress.page_loaded(&page, i + 1, total);
            pages.push(page);
        }

        // --- Extracting ---
        progress.phase(RunPhase::Extracting);
        let mut keywords = KeywordSet::new();
        let mut skipped = Vec::new();
        let mut pages_used = 0;

        for page in &pages {
            if page.is_valid() {
                let added = serpcluster_keywords::extract_into(&mut keywords, &page.text);
                debug!(url = %page.url, added, "keywords merged");
                pages_used += 1;
            } else {
                warn!(url = %page.url, reason = %page.status, "skipping page");
                skipped.push(SkippedPage {
                    url: page.url.clone(),
                    reason: page.status.to_string(),
                });
            }
        }

        // --- Clustering ---
        progress.phase(RunPhase::Clustering);
        let clusters = serpcluster_cluster::cluster(
            &keywords,
            self.config.cluster_count,
            &self.config.clustering,
            self.config.random_seed,
        )
        .inspect_err(|e| warn!(keywords = keywords.len(), error = %e, "clustering failed"))?;

        // --- Storing ---
        progress.phase(RunPhase::Storing);
        let record = RunRecord {
            id: run_id.clone(),
            query: query.to_string(),
            started_at,
            finished_at: Utc::now(),
            pages_used,
            pages_skipped: skipped.len(),
            keyword_count: keywords.len(),
            cluster_count: clusters.cluster_count(),
        };
        let rows_stored = self.store.append_run(&record, &clusters).await?;

        let report = RunReport {
            run_id,
            query: query.clone(),
            clusters,
            pages_used,
            skipped,
            keyword_count: keywords.len(),
            rows_stored,
            elapsed: start.elapsed(),
        };

        progress.done(&report);

        info!(
            pages_used = report.pages_used,
            pages_skipped = report.skipped.len(),
            keywords = report.keyword_count,
            clusters = report.clusters.cluster_count(),
            elapsed_ms = report.elapsed.as_millis(),
            "run complete"
        );

        Ok(report)
    }
}
