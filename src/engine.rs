//! The per-engine page handler contract.

use scraper::{ElementRef, Selector};

use crate::context::Context;
use crate::transport::{HttpRequest, HttpResponse};
use crate::{Result, SearchError};

/// Pluggable per-source logic driven by a [`PagingSession`](crate::PagingSession).
///
/// The accumulator owns its page cursor and all completion semantics; the
/// session only calls these methods in order and watches
/// [`Context::is_completed`]. An accumulator whose cursor is unbounded must
/// complete the context itself on a hard ceiling.
pub trait Accumulator: Send {
    /// The aggregate built up over the pages.
    type Output: Send;

    /// Engine name used in logs and results.
    fn name(&self) -> &str;

    /// Builds the request for the current cursor position.
    fn build_request(&self, context: &Context) -> Result<HttpRequest>;

    /// Parses one page and merges it into `previous` (`None` on the first page).
    ///
    /// Calls [`Context::complete`] once no further page is wanted.
    fn handle(
        &mut self,
        response: HttpResponse,
        previous: Option<Self::Output>,
        context: &mut Context,
    ) -> Result<Self::Output>;

    /// Moves the cursor to the next page.
    fn advance(&mut self, context: &mut Context);
}

/// Parses a CSS selector, mapping failures to [`SearchError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector: {:?}", e)))
}

/// Rejects any status other than 200.
pub(crate) fn require_ok(response: &HttpResponse) -> Result<()> {
    if response.status != 200 {
        return Err(SearchError::Parse(format!(
            "status is not OK: {}",
            response.status
        )));
    }
    Ok(())
}

/// Trimmed text content of an element, or `None` if blank.
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}
