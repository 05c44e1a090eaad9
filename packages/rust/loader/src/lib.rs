//! Page loading for the keyword pipeline.
//!
//! [`PageLoader::load`] fetches one result URL, extracts its visible text and
//! decides whether the page is usable. It never returns an error: every
//! failure is folded into the returned [`PageContent`]'s status so one bad
//! page cannot abort a run.

mod text;

use std::net::IpAddr;

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Response};
use tracing::{debug, instrument, warn};
use url::Url;

use serpcluster_shared::{PageContent, PageStatus, PipelineConfig, Result, SerpClusterError};

/// Maximum number of redirects followed per page.
const MAX_REDIRECTS: usize = 5;

/// Largest page body we read (10 MiB).
const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// PageLoader
// ---------------------------------------------------------------------------

/// Fetches pages with a shared client and applies the validity rule.
#[derive(Debug, Clone)]
pub struct PageLoader {
    client: Client,
    min_page_length: usize,
    allow_private_hosts: bool,
}

impl PageLoader {
    /// Build a loader using the timeout, User-Agent and thresholds of `config`.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = client_builder(config)
            .build()
            .map_err(|e| SerpClusterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            min_page_length: config.min_page_length,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// Load `url` and classify it.
    #[instrument(skip(self))]
    pub async fn load(&self, url: &str) -> PageContent {
        let text = match self.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "page load failed");
                return PageContent::failed(url, e.to_string());
            }
        };

        let length = text.chars().count();
        let status = if length < self.min_page_length {
            debug!(length, minimum = self.min_page_length, "page below minimum length");
            PageStatus::TooShort {
                length,
                minimum: self.min_page_length,
            }
        } else {
            debug!(length, "page loaded");
            PageStatus::Valid
        };

        PageContent {
            url: url.to_string(),
            text,
            status,
        }
    }

    async fn fetch_text(&self, raw_url: &str) -> Result<String> {
        let url = Url::parse(raw_url)
            .map_err(|e| SerpClusterError::validation(format!("invalid URL {raw_url}: {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&url) {
            return Err(SerpClusterError::validation(format!(
                "{url}: refusing to load local or private address"
            )));
        }

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| SerpClusterError::Network(format!("{url}: {}", describe(&e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SerpClusterError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(SerpClusterError::validation(format!(
                    "{url}: unsupported content type {content_type}"
                )));
            }
        }

        if let Some(len) = response.content_length() {
            if len > MAX_BODY_SIZE {
                return Err(SerpClusterError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_BODY_SIZE})"
                )));
            }
        }

        let body = read_capped(&mut response, &url).await?;
        Ok(text::visible_text(&String::from_utf8_lossy(&body)))
    }
}

/// Client settings shared by every page fetch.
///
/// Each redirect hop is re-checked against the private-host guard, so a
/// public URL cannot bounce the loader onto an internal address.
fn client_builder(config: &PipelineConfig) -> ClientBuilder {
    let allow_private_hosts = config.allow_private_hosts;
    let redirect = Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            let error = format!("too many redirects (max {MAX_REDIRECTS})");
            attempt.error(error)
        } else if !allow_private_hosts && is_ssrf_target(attempt.url()) {
            let error = format!("redirect to local or private address {}", attempt.url());
            attempt.error(error)
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect)
        .timeout(config.fetch_timeout)
}

/// The error and its causes, so a redirect refusal keeps its reason.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Read the body chunk by chunk, giving up as soon as it passes
/// [`MAX_BODY_SIZE`]. Chunked responses carry no length up front.
async fn read_capped(response: &mut Response, url: &Url) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| SerpClusterError::Network(format!("{url}: body read failed: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > MAX_BODY_SIZE {
            return Err(SerpClusterError::validation(format!(
                "{url}: response too large (over {MAX_BODY_SIZE} bytes)"
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// HTML, XML and plain-text documents are the only ones we mine.
fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/") || mime.ends_with("+xml") || mime.ends_with("/xml")
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a local or otherwise non-public resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10
                || (a == 100 && (b & 0xC0) == 64)
                || (a == 192 && b == 0 && c == 0)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 and fe80::/10
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}
