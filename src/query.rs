//! Search query representation.

use serde::Serialize;

use crate::{Result, SearchError};

/// A validated search query.
///
/// Construction fails fast on empty text or a requested count outside
/// `1..=ceiling`, so an accumulator never sees an invalid query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    text: String,
    requested: usize,
}

impl SearchQuery {
    /// Creates a query asking for `requested` results from an engine that
    /// can deliver at most `ceiling`.
    pub fn new(text: impl Into<String>, requested: usize, ceiling: usize) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SearchError::Configuration("Query cannot be empty".into()));
        }
        if requested == 0 || requested > ceiling {
            return Err(SearchError::Configuration(format!(
                "Requested result count {} is outside 1..={}",
                requested, ceiling
            )));
        }
        Ok(Self { text, requested })
    }

    /// The search terms.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The number of results the caller asked for.
    pub fn requested(&self) -> usize {
        self.requested
    }
}
