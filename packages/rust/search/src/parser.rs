//! DuckDuckGo HTML results parser.
//!
//! The HTML-only endpoint renders each organic hit as a `.result` block whose
//! `.result__a` anchor points either straight at the target or at a
//! `//duckduckgo.com/l/?uddg=<encoded target>` redirect.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use serpcluster_shared::{Result, SerpClusterError};

/// Result blocks, excluding ads.
const RESULT_SELECTOR: &str =
    ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)";

/// Title anchor inside a result block.
const LINK_SELECTOR: &str = ".result__a";

/// Extract up to `max_results` result URLs, in page order.
///
/// Entries without a usable link are skipped. Repeated URLs keep their first
/// position only.
pub(crate) fn parse_results(html: &str, max_results: usize) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let result_sel = Selector::parse(RESULT_SELECTOR)
        .map_err(|e| SerpClusterError::parse(format!("invalid result selector: {e:?}")))?;
    let link_sel = Selector::parse(LINK_SELECTOR)
        .map_err(|e| SerpClusterError::parse(format!("invalid link selector: {e:?}")))?;

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for block in document.select(&result_sel) {
        if urls.len() >= max_results {
            break;
        }

        let Some(href) = block
            .select(&link_sel)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
        else {
            continue;
        };

        let Some(url) = resolve_href(href) else {
            continue;
        };

        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    Ok(urls)
}

/// Turn a result anchor's `href` into the target page URL.
///
/// Returns `None` for anything that is not an absolute http(s) URL once any
/// DuckDuckGo redirect wrapper is removed.
pub(crate) fn resolve_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;

    let target = if parsed.host_str().is_some_and(is_duckduckgo_host)
        && parsed.path().starts_with("/l/")
    {
        let uddg = parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())?;
        Url::parse(&uddg).ok()?
    } else {
        parsed
    };

    match target.scheme() {
        "http" | "https" => Some(target.to_string()),
        _ => None,
    }
}

fn is_duckduckgo_host(host: &str) -> bool {
    host == "duckduckgo.com" || host.ends_with(".duckduckgo.com")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_block(href: &str, title: &str) -> String {
        format!(
            r#"<div class="result results_links results_links_deep web-result">
                <h2 class="result__title"><a class="result__a" href="{href}">{title}</a></h2>
                <a class="result__snippet" href="{href}">Snippet for {title}</a>
            </div>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!(
            "<html><body><div id=\"links\">{}</div></body></html>",
            blocks.join("\n")
        )
    }

    #[test]
    fn unwraps_redirect_links() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fseo%2Dguide&rut=abc";
        assert_eq!(
            resolve_href(href).as_deref(),
            Some("https://example.com/seo-guide")
        );
    }

    #[test]
    fn lookalike_hosts_are_not_unwrapped() {
        let href = "https://evilduckduckgo.com/l/?uddg=https%3A%2F%2Fx.example%2F";
        assert_eq!(resolve_href(href).as_deref(), Some(href));

        let href = "https://html.duckduckgo.com/l/?uddg=https%3A%2F%2Fx.example%2F";
        assert_eq!(resolve_href(href).as_deref(), Some("https://x.example/"));
    }

    #[test]
    fn keeps_direct_links() {
        assert_eq!(
            resolve_href("https://example.org/page").as_deref(),
            Some("https://example.org/page")
        );
    }

    #[test]
    fn rejects_non_http_and_broken_links() {
        assert_eq!(resolve_href("javascript:void(0)"), None);
        assert_eq!(resolve_href(""), None);
        assert_eq!(resolve_href("//duckduckgo.com/l/?rut=missing-target"), None);
        assert_eq!(resolve_href("ftp://files.example.com/a"), None);
    }

    #[test]
    fn preserves_provider_order_and_caps() {
        let html = page(&[
            result_block("https://a.example.com/", "A"),
            result_block("https://b.example.com/", "B"),
            result_block("https://c.example.com/", "C"),
        ]);
        let urls = parse_results(&html, 2).unwrap();
        assert_eq!(urls, vec!["https://a.example.com/", "https://b.example.com/"]);
    }

    #[test]
    fn skips_malformed_entries_and_ads() {
        let html = page(&[
            r#"<div class="result results_links results_links_deep web-result"><h2>No anchor</h2></div>"#.to_string(),
            r#"<div class="result results_links results_links_deep result--ad"><a class="result__a" href="https://ads.example.com/">Ad</a></div>"#.to_string(),
            result_block("mailto:someone@example.com", "Mail"),
            result_block("https://good.example.com/post", "Good"),
        ]);
        let urls = parse_results(&html, 10).unwrap();
        assert_eq!(urls, vec!["https://good.example.com/post"]);
    }

    #[test]
    fn drops_duplicate_urls() {
        let html = page(&[
            result_block("https://dup.example.com/", "One"),
            result_block(
                "//duckduckgo.com/l/?uddg=https%3A%2F%2Fdup.example.com%2F",
                "Two",
            ),
            result_block("https://other.example.com/", "Three"),
        ]);
        let urls = parse_results(&html, 10).unwrap();
        assert_eq!(urls, vec!["https://dup.example.com/", "https://other.example.com/"]);
    }

    #[test]
    fn empty_page_has_no_results() {
        let urls = parse_results("<html><body>No results.</body></html>", 10).unwrap();
        assert!(urls.is_empty());
    }
}
