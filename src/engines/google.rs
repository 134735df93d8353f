//! Google web search, paged by result offset.

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::context::Context;
use crate::engine::{element_text, require_ok, selector, Accumulator};
use crate::transport::{HttpRequest, HttpResponse};
use crate::{Result, SearchError, SearchQuery, SearchResponse, SearchResult};

/// Results requested per page.
pub const PAGE_RESULT_LIMIT: usize = 100;

/// Offset ceiling; also the largest result count a query may ask for.
pub const GENERAL_RESULT_LIMIT: usize = 1000;

const DEFAULT_BASE_URL: &str = "https://www.google.com/search";

/// Google search accumulator.
///
/// Completes when the requested count is reached, when the page carries the
/// "omitted results" notice or no next-page link, or when the offset ceiling
/// is hit.
pub struct Google {
    query: SearchQuery,
    start: usize,
    base_url: String,
}

impl Google {
    /// Prepares a search for `count` results.
    pub fn new(text: impl Into<String>, count: usize) -> Result<Self> {
        Ok(Self {
            query: SearchQuery::new(text, count, GENERAL_RESULT_LIMIT)?,
            start: 0,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the search at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    fn parse_page(
        &self,
        html: &str,
        response: &mut SearchResponse,
        first_page: bool,
        context: &mut Context,
    ) -> Result<()> {
        let document = Html::parse_document(html);

        if first_page {
            let stats_selector = selector("#resultStats, #result-stats")?;
            response.stats.total_result_count = document
                .select(&stats_selector)
                .next()
                .and_then(parse_total_count);
        }

        let list_selector = selector("li.g")?;
        let block_selector = selector("div.g")?;
        let mut containers: Vec<ElementRef<'_>> = document.select(&list_selector).collect();
        if containers.is_empty() {
            containers = document.select(&block_selector).collect();
        }

        for element in containers {
            match parse_result(element)? {
                Some(result) => response.push(result),
                None => debug!("Dropping unparseable Google result"),
            }
            if response.is_full() {
                context.complete();
                return Ok(());
            }
        }

        if !has_next_page(&document)? {
            debug!("Google reports no further results");
            context.complete();
        }

        Ok(())
    }
}

fn parse_total_count(element: ElementRef<'_>) -> Option<u64> {
    let text = element.text().collect::<String>();
    // The timing suffix "(0.42 seconds)" carries digits too.
    let count = text.split('(').next().unwrap_or_default();
    let digits: String = count.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Maps one result block to a result; `None` if title or link is missing.
fn parse_result(element: ElementRef<'_>) -> Result<Option<SearchResult>> {
    let title_selector = selector("h3")?;
    let link_selector = selector("a[href]")?;
    let snippet_selector = selector("span.st, div.VwiC3b, div[data-sncf]")?;

    let Some(title) = element.select(&title_selector).next().and_then(element_text) else {
        return Ok(None);
    };
    let Some(link) = element
        .select(&link_selector)
        .filter_map(|a| a.value().attr("href"))
        .find_map(resolve_link)
    else {
        return Ok(None);
    };

    let mut result = SearchResult::new(title, link);
    result.snippet = element.select(&snippet_selector).next().and_then(element_text);
    Ok(Some(result))
}

/// Resolves a result href, unwrapping `/url?q=` redirects and skipping
/// Google-internal links.
fn resolve_link(href: &str) -> Option<String> {
    if let Some(query) = href.strip_prefix("/url?") {
        let target = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("q="))?;
        let decoded = urlencoding::decode(target).ok()?;
        return (!decoded.is_empty()).then(|| decoded.into_owned());
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    None
}

fn has_next_page(document: &Html) -> Result<bool> {
    if document.select(&selector("p#ofr")?).next().is_some() {
        return Ok(false);
    }
    if document.select(&selector("a#pnnext")?).next().is_some() {
        return Ok(true);
    }
    let anchor = selector("a")?;
    Ok(document
        .select(&selector("table#nav td:not(.b)")?)
        .last()
        .is_some_and(|cell| cell.select(&anchor).next().is_some()))
}

impl Accumulator for Google {
    type Output = SearchResponse;

    fn name(&self) -> &str {
        "Google"
    }

    fn build_request(&self, _context: &Context) -> Result<HttpRequest> {
        HttpRequest::parse(&format!(
            "{}?q={}&start={}&num={}",
            self.base_url,
            urlencoding::encode(self.query.text()),
            self.start,
            PAGE_RESULT_LIMIT
        ))
    }

    fn handle(
        &mut self,
        response: HttpResponse,
        previous: Option<SearchResponse>,
        context: &mut Context,
    ) -> Result<SearchResponse> {
        require_ok(&response)?;

        if response.body.contains("/sorry/index") || response.body.contains("recaptcha") {
            return Err(SearchError::ContentBan {
                engine: self.name().to_string(),
                reason: "CAPTCHA page (bot detected)".to_string(),
            });
        }

        let first_page = previous.is_none();
        let mut value =
            previous.unwrap_or_else(|| SearchResponse::new(self.name(), self.query.clone()));
        self.parse_page(&response.body, &mut value, first_page, context)?;
        Ok(value)
    }

    fn advance(&mut self, context: &mut Context) {
        self.start += PAGE_RESULT_LIMIT;
        if self.start >= GENERAL_RESULT_LIMIT {
            context.complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> HttpResponse {
        HttpResponse::new(200, format!("<html><body>{}</body></html>", body))
    }

    fn result_block(n: usize) -> String {
        format!(
            r#"<li class="g"><h3 class="r"><a href="/url?q=https%3A%2F%2Fexample.com%2F{n}&amp;sa=U">Result {n}</a></h3><span class="st">Snippet {n}</span></li>"#,
            n = n
        )
    }

    const NEXT: &str = r#"<table id="nav"><tr><td class="b">Prev</td><td><a href="/search?start=100">Next</a></td></tr></table>"#;

    #[test]
    fn test_google_new() {
        let engine = Google::new("rust", 10).unwrap();
        assert_eq!(engine.name(), "Google");
        assert_eq!(engine.query().requested(), 10);
    }

    #[test]
    fn test_google_rejects_invalid_count() {
        assert!(matches!(
            Google::new("rust", GENERAL_RESULT_LIMIT + 1),
            Err(SearchError::Configuration(_))
        ));
        assert!(Google::new("", 10).is_err());
    }

    #[test]
    fn test_build_request() {
        let engine = Google::new("rust lang", 10).unwrap();
        let request = engine.build_request(&Context::new()).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://www.google.com/search?q=rust%20lang&start=0&num=100"
        );
    }

    #[test]
    fn test_advance_moves_offset_and_hits_ceiling() {
        let mut engine = Google::new("rust", 10).unwrap();
        let mut context = Context::new();
        engine.advance(&mut context);
        assert!(engine
            .build_request(&context)
            .unwrap()
            .url()
            .as_str()
            .contains("start=100"));
        for _ in 0..8 {
            engine.advance(&mut context);
        }
        assert!(!context.is_completed());
        engine.advance(&mut context);
        assert!(context.is_completed());
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("/url?q=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&sa=U").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(
            resolve_link("https://www.rust-lang.org/").as_deref(),
            Some("https://www.rust-lang.org/")
        );
        assert!(resolve_link("/search?q=related").is_none());
        assert!(resolve_link("/url?sa=U").is_none());
    }

    #[test]
    fn test_handle_parses_results_and_stats() {
        let mut engine = Google::new("rust", 10).unwrap();
        let mut context = Context::new();
        let body = format!(
            r#"<div id="resultStats">About 1,234,000 results<nobr> (0.42 seconds)</nobr></div><ol>{}{}</ol>{}"#,
            result_block(1),
            result_block(2),
            NEXT
        );
        let response = engine.handle(page(&body), None, &mut context).unwrap();
        assert_eq!(response.len(), 2);
        assert_eq!(response.stats.total_result_count, Some(1_234_000));
        assert_eq!(response.items()[0].title.as_deref(), Some("Result 1"));
        assert_eq!(response.items()[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(response.items()[0].snippet.as_deref(), Some("Snippet 1"));
        assert!(!context.is_completed());
    }

    #[test]
    fn test_handle_modern_markup() {
        let mut engine = Google::new("rust", 10).unwrap();
        let mut context = Context::new();
        let body = r#"
            <div class="g">
                <a href="https://www.rust-lang.org/"><h3>Rust Programming Language</h3></a>
                <div class="VwiC3b">A language empowering everyone.</div>
            </div>
            <a id="pnnext" href="/search?start=100">Next</a>
        "#;
        let response = engine.handle(page(body), None, &mut context).unwrap();
        assert_eq!(response.len(), 1);
        assert_eq!(
            response.items()[0].link.as_deref(),
            Some("https://www.rust-lang.org/")
        );
        assert!(!context.is_completed());
    }

    #[test]
    fn test_handle_drops_unparseable_fragments() {
        let mut engine = Google::new("rust", 10).unwrap();
        let mut context = Context::new();
        let body = format!(
            r#"<ol><li class="g"><a href="https://no-title.example">x</a></li><li class="g"><h3>Internal</h3><a href="/search?q=x">x</a></li>{}</ol>{}"#,
            result_block(3),
            NEXT
        );
        let response = engine.handle(page(&body), None, &mut context).unwrap();
        assert_eq!(response.len(), 1);
        assert_eq!(response.items()[0].title.as_deref(), Some("Result 3"));
    }

    #[test]
    fn test_handle_completes_at_requested_count() {
        let mut engine = Google::new("rust", 3).unwrap();
        let mut context = Context::new();
        let first = format!("<ol>{}{}</ol>{}", result_block(1), result_block(2), NEXT);
        let value = engine.handle(page(&first), None, &mut context).unwrap();
        assert!(!context.is_completed());
        let second = format!("<ol>{}{}</ol>{}", result_block(3), result_block(4), NEXT);
        let value = engine
            .handle(page(&second), Some(value), &mut context)
            .unwrap();
        assert!(context.is_completed());
        assert_eq!(value.len(), 3);
    }

    #[test]
    fn test_handle_completes_without_next_link() {
        let mut engine = Google::new("rust", 10).unwrap();
        let mut context = Context::new();
        let body = format!(
            r#"<ol>{}</ol><table id="nav"><tr><td class="b">Prev</td><td>Next</td></tr></table>"#,
            result_block(1)
        );
        engine.handle(page(&body), None, &mut context).unwrap();
        assert!(context.is_completed());
    }

    #[test]
    fn test_handle_completes_on_omitted_results_notice() {
        let mut engine = Google::new("rust", 10).unwrap();
        let mut context = Context::new();
        let body = format!(r#"<ol>{}</ol><p id="ofr">Omitted</p>{}"#, result_block(1), NEXT);
        engine.handle(page(&body), None, &mut context).unwrap();
        assert!(context.is_completed());
    }

    #[test]
    fn test_handle_rejects_non_ok_status() {
        let mut engine = Google::new("rust", 10).unwrap();
        let result = engine.handle(HttpResponse::new(404, ""), None, &mut Context::new());
        assert!(matches!(result, Err(SearchError::Parse(_))));
    }

    #[test]
    fn test_handle_detects_captcha() {
        let mut engine = Google::new("rust", 10).unwrap();
        let body = r#"<a href="/sorry/index?continue=https://www.google.com/search">blocked</a>"#;
        let result = engine.handle(page(body), None, &mut Context::new());
        assert!(matches!(result, Err(SearchError::ContentBan { .. })));

        let body = r#"<iframe src="https://www.google.com/recaptcha/enterprise/anchor"></iframe>"#;
        let result = engine.handle(page(body), None, &mut Context::new());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("CAPTCHA"), "Expected CAPTCHA error, got: {}", err);
    }
}
