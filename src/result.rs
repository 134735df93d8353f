//! Search result types.

use serde::Serialize;

use crate::SearchQuery;

/// A single search result.
///
/// Every field is optional: a source may omit any of them, but a fragment
/// that cannot be parsed at all produces no result instead of a partial one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Result title.
    pub title: Option<String>,
    /// Target URL.
    pub link: Option<String>,
    /// Text excerpt.
    pub snippet: Option<String>,
}

impl SearchResult {
    /// Creates a result with title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
            snippet: None,
        }
    }

    /// Sets the snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Engine-specific statistics reported next to the results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Approximate number of matches the engine claims to have.
    pub total_result_count: Option<u64>,
}

/// The aggregate produced by one paging session.
///
/// Results are append-only and keep page arrival order; nothing is deduplicated.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    engine: String,
    query: SearchQuery,
    results: Vec<SearchResult>,
    /// Engine-specific statistics.
    pub stats: EngineStats,
}

impl SearchResponse {
    /// Creates an empty response for the given engine and query.
    pub fn new(engine: impl Into<String>, query: SearchQuery) -> Self {
        Self {
            engine: engine.into(),
            query,
            results: Vec::new(),
            stats: EngineStats::default(),
        }
    }

    /// Appends a result.
    pub fn push(&mut self, result: SearchResult) {
        self.results.push(result);
    }

    /// Returns whether the requested number of results has been collected.
    pub fn is_full(&self) -> bool {
        self.results.len() >= self.query.requested()
    }

    /// Name of the engine that produced the results.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// The query that was searched.
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Returns the results.
    pub fn items(&self) -> &[SearchResult] {
        &self.results
    }

    /// Number of collected results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns whether no result was collected.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consumes the response, returning the results.
    pub fn into_items(self) -> Vec<SearchResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(requested: usize) -> SearchQuery {
        SearchQuery::new("rust", requested, 100).unwrap()
    }

    #[test]
    fn test_search_result_new() {
        let result = SearchResult::new("Title", "https://example.com");
        assert_eq!(result.title.as_deref(), Some("Title"));
        assert_eq!(result.link.as_deref(), Some("https://example.com"));
        assert!(result.snippet.is_none());
    }

    #[test]
    fn test_search_result_with_snippet() {
        let result = SearchResult::new("t", "l").with_snippet("s");
        assert_eq!(result.snippet.as_deref(), Some("s"));
    }

    #[test]
    fn test_search_result_default() {
        let result = SearchResult::default();
        assert!(result.title.is_none());
        assert!(result.link.is_none());
    }

    #[test]
    fn test_search_response_new() {
        let response = SearchResponse::new("Google", query(3));
        assert_eq!(response.engine(), "Google");
        assert_eq!(response.query().text(), "rust");
        assert!(response.is_empty());
        assert!(response.stats.total_result_count.is_none());
    }

    #[test]
    fn test_search_response_keeps_order_and_duplicates() {
        let mut response = SearchResponse::new("Google", query(5));
        response.push(SearchResult::new("a", "https://a.example"));
        response.push(SearchResult::new("b", "https://b.example"));
        response.push(SearchResult::new("a", "https://a.example"));
        let titles: Vec<_> = response
            .items()
            .iter()
            .map(|r| r.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_search_response_is_full() {
        let mut response = SearchResponse::new("Google", query(2));
        response.push(SearchResult::new("a", "l"));
        assert!(!response.is_full());
        response.push(SearchResult::new("b", "l"));
        assert!(response.is_full());
    }

    #[test]
    fn test_search_response_serialization() {
        let mut response = SearchResponse::new("ETools", query(1));
        response.push(SearchResult::new("Title", "https://example.com"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"engine\":\"ETools\""));
        assert!(json.contains("\"title\":\"Title\""));
        assert!(json.contains("\"snippet\":null"));
    }
}
