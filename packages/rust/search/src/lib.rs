//! Web search for candidate pages.
//!
//! [`DuckDuckGoProvider`] posts the query to DuckDuckGo's JavaScript-free
//! results page and scrapes result links out of the returned HTML.
//! [`fetch_result_urls`] is what the pipeline calls: it never fails, a broken
//! search simply yields no URLs.

mod parser;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument, warn};

use serpcluster_shared::{Query, Result, SearchConfig, SearchProvider, SerpClusterError};

/// Maximum number of redirects to follow for a search request.
const MAX_REDIRECTS: usize = 3;

/// Largest results page we are willing to parse (5 MB).
const MAX_RESPONSE_SIZE: u64 = 5 * 1024 * 1024;

/// Sent when no custom User-Agent is configured; the HTML endpoint serves
/// degraded markup to unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// DuckDuckGo HTML search.
#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    client: Client,
    config: SearchConfig,
}

impl DuckDuckGoProvider {
    /// Build a provider with its own HTTP client.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let user_agent = config.user_agent.as_deref().unwrap_or(BROWSER_USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SerpClusterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn form<'a>(&'a self, query: &'a Query) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("q", query.as_str())];
        if let Some(region) = self.config.region.as_deref() {
            form.push(("kl", region));
        }
        if self.config.safe_search {
            form.push(("kp", "1"));
        }
        form
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    #[instrument(skip_all, fields(query = %query, max_results = max_results))]
    async fn search(&self, query: &Query, max_results: usize) -> Result<Vec<String>> {
        let endpoint = &self.config.endpoint;
        debug!(%endpoint, "sending search request");

        let mut response = self
            .client
            .post(endpoint)
            .form(&self.form(query))
            .send()
            .await
            .map_err(|e| SerpClusterError::Network(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SerpClusterError::Network(format!(
                "{endpoint}: HTTP {status}"
            )));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(SerpClusterError::validation(format!(
                    "{endpoint}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = read_capped(&mut response, endpoint).await?;
        let urls = parser::parse_results(&String::from_utf8_lossy(&body), max_results)?;
        debug!(results = urls.len(), "search results parsed");
        Ok(urls)
    }
}

/// Buffer the results page, stopping once it passes [`MAX_RESPONSE_SIZE`].
async fn read_capped(response: &mut Response, endpoint: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| SerpClusterError::Network(format!("{endpoint}: failed to read body: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > MAX_RESPONSE_SIZE {
            return Err(SerpClusterError::validation(format!(
                "{endpoint}: response too large (over {MAX_RESPONSE_SIZE} bytes)"
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Pipeline entry point
// ---------------------------------------------------------------------------

/// Ask `provider` for up to `max_results` URLs.
///
/// Any provider failure is logged and reported as an empty list, which the
/// pipeline treats the same as a search with no hits.
#[instrument(skip_all, fields(provider = provider.name(), query = %query))]
pub async fn fetch_result_urls(
    provider: &dyn SearchProvider,
    query: &Query,
    max_results: usize,
) -> Vec<String> {
    match provider.search(query, max_results).await {
        Ok(mut urls) => {
            urls.truncate(max_results);
            info!(results = urls.len(), "search complete");
            urls
        }
        Err(e) => {
            warn!(error = %e, "search failed, continuing with no results");
            Vec::new()
        }
    }
}
