use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::data_models::SearchResult;

/// Number of results fetched for a triggered query.
pub const MAX_RESULTS: usize = 6;

const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = concat!("study-planner/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search provider returned {0}")]
    Status(reqwest::StatusCode),
    #[error("could not parse search results: {0}")]
    Parse(String),
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Returns at most `max_results` results, in provider rank order.
    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchResult>, SearchError>;
}

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<DuckDuckGoSearch, SearchError> {
        Self::with_endpoint(DUCKDUCKGO_HTML_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<DuckDuckGoSearch, SearchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(DuckDuckGoSearch {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    async fn fetch_page(&self, query: &str) -> Result<String, SearchError> {
        let res = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query)])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(SearchError::Status(res.status()));
        }
        Ok(res.text().await?)
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        log::debug!("searching duckduckgo for: {query}");
        let html = self.fetch_page(query).await?;
        let results = parse_results(&html, max_results)?;
        log::info!("duckduckgo returned {} results for: {query}", results.len());
        Ok(results)
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts results from a DuckDuckGo HTML results page.
///
/// Sponsored blocks are skipped, as is any entry missing a title or link.
pub fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);
    let result_selector = selector("div.result")?;
    let link_selector = selector("a.result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let mut results = Vec::new();
    for block in document.select(&result_selector) {
        if results.len() >= max_results {
            break;
        }
        if block.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(link) = block.select(&link_selector).next() else {
            continue;
        };
        let title = element_text(link);
        let href = link
            .value()
            .attr("href")
            .and_then(resolve_href)
            .unwrap_or_default();
        if title.is_empty() || href.is_empty() {
            continue;
        }
        let body = block
            .select(&snippet_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        results.push(SearchResult::new(title, href, body));
    }
    Ok(results)
}

/// DuckDuckGo wraps outbound links in a `/l/?uddg=<target>` redirect; unwrap it.
fn resolve_href(raw: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let mut resolved = base.join(raw).ok()?;
    if resolved.path() == "/l/" {
        let target = resolved
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
        if let Some(target) = target {
            resolved = Url::parse(&target).ok()?;
        }
    }
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_block(title: &str, href: &str, snippet: &str) -> String {
        format!(
            r#"<div class="result results_links web-result">
                 <h2 class="result__title"><a class="result__a" href="{href}">{title}</a></h2>
                 <a class="result__snippet" href="{href}">{snippet}</a>
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
    fn test_parse_results_unwraps_redirects() {
        let html = page(&[result_block(
            "Rust <b>Programming</b> Language",
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&rut=abc",
            "A language empowering <b>everyone</b>.",
        )]);

        let results = parse_results(&html, MAX_RESULTS).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].href, "https://www.rust-lang.org/");
        assert_eq!(results[0].body, "A language empowering everyone.");
    }

    #[test]
    fn test_parse_results_respects_limit_and_skips_incomplete() {
        let mut blocks = vec![result_block("", "https://empty-title.example", "x")];
        for i in 0..10 {
            blocks.push(result_block(
                &format!("Result {i}"),
                &format!("https://example.com/{i}"),
                "snippet",
            ));
        }
        let results = parse_results(&page(&blocks), 6).unwrap();
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].title, "Result 0");
        assert_eq!(results[5].href, "https://example.com/5");
    }

    #[test]
    fn test_parse_results_skips_ads() {
        let ad = r#"<div class="result result--ad">
                      <a class="result__a" href="https://ads.example">Buy now</a>
                    </div>"#
            .to_string();
        let html = page(&[ad, result_block("Organic", "https://organic.example", "")]);
        let results = parse_results(&html, MAX_RESULTS).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Organic");
        assert_eq!(results[0].body, "");
    }

    #[test]
    fn test_parse_results_truncates_long_snippets() {
        let snippet = "word ".repeat(100);
        let html = page(&[result_block("Long", "https://long.example", &snippet)]);
        let results = parse_results(&html, MAX_RESULTS).unwrap();
        assert!(results[0].body.ends_with("..."));
        assert_eq!(results[0].body.chars().count(), 303);
    }

    #[test]
    fn test_parse_results_drops_redirects_to_non_http() {
        let html = page(&[
            result_block("Bad", "//duckduckgo.com/l/?uddg=javascript%3Aalert(1)", "x"),
            result_block("Good", "//duckduckgo.com/l/?uddg=https%3A%2F%2Fgood.example%2F", "y"),
        ]);
        let results = parse_results(&html, MAX_RESULTS).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].href, "https://good.example/");
    }

    #[test]
    fn test_parse_results_empty_page() {
        let results = parse_results("<html><body>No results.</body></html>", 6).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_resolve_href_rejects_non_http() {
        assert_eq!(resolve_href("javascript:void(0)"), None);
        assert_eq!(
            resolve_href("//duckduckgo.com/l/?uddg=javascript%3Aalert(1)"),
            None
        );
        assert_eq!(
            resolve_href("//duckduckgo.com/l/?uddg=data%3Atext%2Fhtml%2C%3Cb%3Ex"),
            None
        );
        assert_eq!(
            resolve_href("https://example.com/a").as_deref(),
            Some("https://example.com/a")
        );
    }
}
