//! eTools.ch meta search, paged through a server-side session.
//!
//! The first request submits the query and opens a session; every later page
//! is addressed through the `JSESSIONID` the first response sets.

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::context::Context;
use crate::engine::{element_text, require_ok, selector, Accumulator};
use crate::transport::{parse_cookies, HttpRequest, HttpResponse};
use crate::{Result, SearchError, SearchQuery, SearchResponse, SearchResult};

/// Results per page.
pub const PAGE_RESULT_LIMIT: usize = 40;

/// Largest result count eTools serves for one query.
pub const GENERAL_RESULT_LIMIT: usize = 400;

const DEFAULT_BASE_URL: &str = "http://www.etools.ch";

/// Context key holding the session token.
pub const SESSION_KEY: &str = "jsessionid";

const SESSION_COOKIE: &str = "JSESSIONID";

/// eTools search accumulator.
pub struct ETools {
    query: SearchQuery,
    page: usize,
    fetched: usize,
    base_url: String,
}

impl ETools {
    /// Prepares a search for `count` results.
    pub fn new(text: impl Into<String>, count: usize) -> Result<Self> {
        Ok(Self {
            query: SearchQuery::new(text, count, GENERAL_RESULT_LIMIT)?,
            page: 1,
            fetched: 0,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the search at another host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    fn check_banned(&self, document: &Html) -> Result<()> {
        let title = document
            .select(&selector("title")?)
            .next()
            .and_then(element_text)
            .unwrap_or_default()
            .to_lowercase();
        if title.contains("access banned") || title.contains("access denied") {
            return Err(SearchError::ContentBan {
                engine: self.name().to_string(),
                reason: "access banned page".to_string(),
            });
        }
        Ok(())
    }
}

fn session_token(response: &HttpResponse) -> Option<String> {
    response
        .header_values("set-cookie")
        .find_map(|header| parse_cookies(header).remove(SESSION_COOKIE))
        .filter(|token| !token.is_empty())
}

/// Maps one `.record` block: a title link followed by the snippet.
fn parse_record(record: ElementRef<'_>) -> Option<SearchResult> {
    let mut children = record.children().filter_map(ElementRef::wrap);
    let anchor = children.next()?;
    let snippet = children.next()?;
    if anchor.value().name() != "a" {
        return None;
    }
    let link = anchor.value().attr("href").filter(|href| !href.is_empty())?;
    let title = element_text(anchor)?;

    let mut result = SearchResult::new(title, link);
    result.snippet = element_text(snippet);
    Some(result)
}

impl Accumulator for ETools {
    type Output = SearchResponse;

    fn name(&self) -> &str {
        "ETools"
    }

    fn build_request(&self, context: &Context) -> Result<HttpRequest> {
        if self.page == 1 {
            return HttpRequest::parse(&format!(
                "{}/searchAdvancedSubmit.do?query={}&country=web&language=all&dataSourceResults={}&pageResults={}",
                self.base_url,
                urlencoding::encode(self.query.text()),
                PAGE_RESULT_LIMIT,
                PAGE_RESULT_LIMIT
            ));
        }
        let session = context.get_string_or(SESSION_KEY, "");
        HttpRequest::parse(&format!(
            "{}/searchAdvanced.do;jsessionid={}?page={}",
            self.base_url, session, self.page
        ))
    }

    fn handle(
        &mut self,
        response: HttpResponse,
        previous: Option<SearchResponse>,
        context: &mut Context,
    ) -> Result<SearchResponse> {
        require_ok(&response)?;
        let document = Html::parse_document(&response.body);
        self.check_banned(&document)?;

        match session_token(&response) {
            Some(token) => context.set_string(SESSION_KEY, token),
            None if previous.is_none() => warn!("ETools did not open a session"),
            None => {}
        }

        let mut value =
            previous.unwrap_or_else(|| SearchResponse::new(self.name(), self.query.clone()));

        let records: Vec<_> = document.select(&selector(".record")?).collect();
        // No records means the result list ran out before the ceiling.
        if records.is_empty() {
            debug!("ETools page {} has no records", self.page);
            context.complete();
            return Ok(value);
        }

        for record in records {
            match parse_record(record) {
                Some(result) => value.push(result),
                None => debug!("Dropping unparseable ETools record"),
            }
            if value.is_full() {
                context.complete();
                break;
            }
        }

        Ok(value)
    }

    fn advance(&mut self, context: &mut Context) {
        self.page += 1;
        self.fetched += PAGE_RESULT_LIMIT;
        if self.fetched >= GENERAL_RESULT_LIMIT {
            context.complete();
        }
    }
}
