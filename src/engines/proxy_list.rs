//! Public proxy listing scraper.
//!
//! The listing obfuscates each host cell with decoy elements, so hosts are
//! recovered through the [`HoneypotFilter`].

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::context::Context;
use crate::engine::{element_text, require_ok, selector, Accumulator};
use crate::honeypot::HoneypotFilter;
use crate::proxy::{Proxy, ProxyScheme, ProxySource};
use crate::session::PagingSession;
use crate::transport::{Direct, HttpRequest, HttpResponse, HttpTransport};
use crate::Result;

/// Proxies wanted on every replenishment after the first.
pub const PAGE_PROXY_LIMIT: usize = 50;

/// Proxies wanted on the first replenishment.
pub const INITIAL_PROXY_COUNT: usize = 1000;

/// Most listing pages read in one session.
pub const MAX_PAGES: usize = 40;

const HOST_CELL: usize = 1;
const PORT_CELL: usize = 2;
const TYPE_CELL: usize = 6;

/// Collects proxies from consecutive listing pages.
pub struct ProxyListPages {
    base_url: String,
    wanted: usize,
    page: usize,
    pages_read: usize,
    filter: HoneypotFilter,
}

impl ProxyListPages {
    /// Reads from page 1 until `wanted` proxies are collected.
    pub fn new(base_url: impl Into<String>, wanted: usize) -> Self {
        Self::starting_at(base_url, wanted, 1)
    }

    /// Reads from `page` until `wanted` proxies are collected.
    pub fn starting_at(base_url: impl Into<String>, wanted: usize, page: usize) -> Self {
        Self {
            base_url: base_url.into(),
            wanted,
            page: page.max(1),
            pages_read: 0,
            filter: HoneypotFilter::new(),
        }
    }

    /// The page the next request would read.
    pub fn page(&self) -> usize {
        self.page
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Option<Proxy> {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| cell.value().name() == "td")
            .collect();
        if cells.len() <= TYPE_CELL {
            return None;
        }

        let host = self.filter.visible_text(cells[HOST_CELL]);
        if host.is_empty() || host.contains(char::is_whitespace) {
            return None;
        }
        let port = element_text(cells[PORT_CELL])?.parse::<u16>().ok()?;
        let scheme = element_text(cells[TYPE_CELL])
            .map(|kind| parse_scheme(&kind))
            .unwrap_or_default();

        Some(Proxy::new(host, port).with_scheme(scheme))
    }
}

fn parse_scheme(kind: &str) -> ProxyScheme {
    let kind = kind.to_ascii_lowercase();
    if kind.contains("socks") {
        ProxyScheme::Socks
    } else if kind.contains("https") {
        ProxyScheme::Https
    } else {
        ProxyScheme::Http
    }
}

impl Accumulator for ProxyListPages {
    type Output = Vec<Proxy>;

    fn name(&self) -> &str {
        "ProxyList"
    }

    fn build_request(&self, _context: &Context) -> Result<HttpRequest> {
        HttpRequest::parse(&format!("{}{}", self.base_url, self.page))
    }

    fn handle(
        &mut self,
        response: HttpResponse,
        previous: Option<Vec<Proxy>>,
        context: &mut Context,
    ) -> Result<Vec<Proxy>> {
        require_ok(&response)?;
        let document = Html::parse_document(&response.body);
        let rows: Vec<_> = document
            .select(&selector("table#listtable > tbody > tr")?)
            .collect();

        let mut proxies = previous.unwrap_or_default();
        if rows.is_empty() {
            debug!("Proxy listing page {} is empty", self.page);
            context.complete();
            return Ok(proxies);
        }

        for row in rows {
            match self.parse_row(row) {
                Some(proxy) => proxies.push(proxy),
                None => debug!("Skipping malformed proxy listing row"),
            }
            if proxies.len() >= self.wanted {
                context.complete();
                break;
            }
        }

        Ok(proxies)
    }

    fn advance(&mut self, context: &mut Context) {
        self.page += 1;
        self.pages_read += 1;
        if self.pages_read >= MAX_PAGES {
            context.complete();
        }
    }
}

/// A [`ProxySource`] that scrapes the listing directly, without proxies.
///
/// The first batch is large; later ones are small and continue from the page
/// where the previous batch stopped.
pub struct ListingProxySource<T> {
    executor: Direct<T>,
    base_url: String,
    next_page: usize,
    first: bool,
}

impl<T: HttpTransport> ListingProxySource<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            executor: Direct::new(transport),
            base_url: base_url.into(),
            next_page: 1,
            first: true,
        }
    }

    pub fn inner(&self) -> &T {
        self.executor.inner()
    }
}

#[async_trait]
impl<T: HttpTransport> ProxySource for ListingProxySource<T> {
    async fn fetch_proxies(&mut self) -> Result<Vec<Proxy>> {
        let wanted = if self.first {
            INITIAL_PROXY_COUNT
        } else {
            PAGE_PROXY_LIMIT
        };
        self.first = false;

        let mut pages = ProxyListPages::starting_at(self.base_url.clone(), wanted, self.next_page);
        let proxies = PagingSession::new(&mut self.executor).run(&mut pages).await?;

        self.next_page = if proxies.is_empty() { 1 } else { pages.page() };
        info!("Scraped {} proxies from {}", proxies.len(), self.base_url);
        Ok(proxies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const BASE: &str = "http://proxies.example/list/";

    fn row(host_cell: &str, port: &str, kind: &str) -> String {
        format!(
            "<tr><td>1 min</td><td>{}</td><td>{}</td><td>US</td><td>fast</td><td>fast</td><td>{}</td><td>high</td></tr>",
            host_cell, port, kind
        )
    }

    fn listing(rows: &[String]) -> String {
        format!(
            r#"<html><body><table id="listtable"><thead><tr><th>h</th></tr></thead><tbody>{}</tbody></table></body></html>"#,
            rows.concat()
        )
    }

    fn plain_rows(range: std::ops::Range<usize>) -> Vec<String> {
        range
            .map(|i| row(&format!("<span>10.0.0.{}</span>", i), "8080", "HTTP"))
            .collect()
    }

    /// Serves listing pages by URL; unknown URLs get an empty listing.
    struct ListingTransport {
        pages: HashMap<String, String>,
        requested: Vec<String>,
    }

    impl ListingTransport {
        fn new(pages: Vec<(usize, String)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(n, body)| (format!("{}{}", BASE, n), body))
                    .collect(),
                requested: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for ListingTransport {
        async fn execute_once(
            &mut self,
            request: &HttpRequest,
            proxy: Option<&Proxy>,
        ) -> Result<HttpResponse> {
            assert!(proxy.is_none());
            let url = request.url().to_string();
            self.requested.push(url.clone());
            let body = self.pages.get(&url).cloned().unwrap_or_else(|| listing(&[]));
            Ok(HttpResponse::new(200, body))
        }
    }

    #[test]
    fn test_parse_scheme() {
        assert_eq!(parse_scheme("HTTP"), ProxyScheme::Http);
        assert_eq!(parse_scheme("HTTPS"), ProxyScheme::Https);
        assert_eq!(parse_scheme("socks4/5"), ProxyScheme::Socks);
        assert_eq!(parse_scheme("unknown"), ProxyScheme::Http);
    }

    #[test]
    fn test_build_request() {
        let pages = ProxyListPages::starting_at(BASE, 10, 3);
        let request = pages.build_request(&Context::new()).unwrap();
        assert_eq!(request.url().as_str(), "http://proxies.example/list/3");
    }

    #[test]
    fn test_handle_strips_decoys_from_host() {
        let host = r#"<span><style>.q1{display:none}</style><span class="q1">66</span>203<div style="display:none">7</div>.0<span class="q1">.1</span>.113.9</span>"#;
        let body = listing(&[row(host, "3128", "HTTPS")]);
        let mut pages = ProxyListPages::new(BASE, 10);
        let proxies = pages
            .handle(HttpResponse::new(200, body), None, &mut Context::new())
            .unwrap();
        assert_eq!(
            proxies,
            vec![Proxy::new("203.0.113.9", 3128).with_scheme(ProxyScheme::Https)]
        );
    }

    #[test]
    fn test_handle_skips_malformed_rows() {
        let rows = vec![
            row("<span>10.0.0.1</span>", "not-a-port", "HTTP"),
            "<tr><td>short</td><td>10.0.0.2</td></tr>".to_string(),
            row("<span>10.0.0.3</span>", "80", "HTTP"),
        ];
        let mut pages = ProxyListPages::new(BASE, 10);
        let proxies = pages
            .handle(HttpResponse::new(200, listing(&rows)), None, &mut Context::new())
            .unwrap();
        assert_eq!(proxies, vec![Proxy::new("10.0.0.3", 80)]);
    }

    #[test]
    fn test_handle_completes_when_enough() {
        let mut pages = ProxyListPages::new(BASE, 3);
        let mut context = Context::new();
        let proxies = pages
            .handle(
                HttpResponse::new(200, listing(&plain_rows(0..5))),
                None,
                &mut context,
            )
            .unwrap();
        assert_eq!(proxies.len(), 3);
        assert!(context.is_completed());
    }

    #[test]
    fn test_handle_completes_on_empty_page() {
        let mut pages = ProxyListPages::new(BASE, 3);
        let mut context = Context::new();
        let proxies = pages
            .handle(HttpResponse::new(200, listing(&[])), None, &mut context)
            .unwrap();
        assert!(proxies.is_empty());
        assert!(context.is_completed());
    }

    #[test]
    fn test_advance_stops_at_page_ceiling() {
        let mut pages = ProxyListPages::new(BASE, INITIAL_PROXY_COUNT);
        let mut context = Context::new();
        for _ in 0..MAX_PAGES - 1 {
            pages.advance(&mut context);
        }
        assert!(!context.is_completed());
        pages.advance(&mut context);
        assert!(context.is_completed());
    }

    #[tokio::test]
    async fn test_listing_source_reads_pages_until_empty() {
        let transport = ListingTransport::new(vec![
            (1, listing(&plain_rows(0..3))),
            (2, listing(&plain_rows(3..5))),
        ]);
        let mut source = ListingProxySource::new(transport, BASE);
        let proxies = source.fetch_proxies().await.unwrap();
        assert_eq!(proxies.len(), 5);
        assert_eq!(proxies[0], Proxy::new("10.0.0.0", 8080));
        assert_eq!(proxies[4], Proxy::new("10.0.0.4", 8080));
        assert_eq!(source.inner().requested.len(), 3);
    }

    #[tokio::test]
    async fn test_listing_source_later_batches_are_small_and_continue() {
        let transport = ListingTransport::new(
            (1..=30)
                .map(|n| (n, listing(&plain_rows(n * 40..n * 40 + 40))))
                .collect(),
        );
        let mut source = ListingProxySource::new(transport, BASE);

        let first = source.fetch_proxies().await.unwrap();
        assert_eq!(first.len(), INITIAL_PROXY_COUNT);
        assert_eq!(source.inner().requested.len(), 25);

        let second = source.fetch_proxies().await.unwrap();
        assert_eq!(second.len(), PAGE_PROXY_LIMIT);
        assert_eq!(second[0], Proxy::new("10.0.0.1040", 8080));
        assert_eq!(
            source.inner().requested[25..],
            [format!("{}26", BASE), format!("{}27", BASE)]
        );
    }
}
