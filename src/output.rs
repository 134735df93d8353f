//! Semicolon-separated result export.
//!
//! One record per result. Every non-numeric field is quoted, with embedded
//! quotes doubled; missing fields are written empty.

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::{Result, SearchResponse, SearchResult};

/// Which fields to write for each result, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFields {
    pub query: bool,
    pub link: bool,
    pub title: bool,
    pub snippet: bool,
}

impl OutputFields {
    /// Every field.
    pub fn all() -> Self {
        Self {
            query: true,
            link: true,
            title: true,
            snippet: true,
        }
    }

    /// Returns whether no field is selected.
    pub fn is_empty(&self) -> bool {
        !(self.query || self.link || self.title || self.snippet)
    }
}

impl Default for OutputFields {
    fn default() -> Self {
        Self::all()
    }
}

/// The selected fields of one result, unquoted.
pub fn result_fields<'a>(
    query: &'a str,
    result: &'a SearchResult,
    fields: OutputFields,
) -> Vec<&'a str> {
    let mut record = Vec::with_capacity(4);
    if fields.query {
        record.push(query);
    }
    if fields.link {
        record.push(result.link.as_deref().unwrap_or_default());
    }
    if fields.title {
        record.push(result.title.as_deref().unwrap_or_default());
    }
    if fields.snippet {
        record.push(result.snippet.as_deref().unwrap_or_default());
    }
    record
}

/// Writes one record per result and returns the number of records written.
///
/// Nothing is written when no field is selected.
pub fn write_response<W: Write>(
    response: &SearchResponse,
    fields: OutputFields,
    out: W,
) -> Result<usize> {
    if fields.is_empty() {
        return Ok(0);
    }
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::NonNumeric)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(out);

    let query = response.query().text();
    for result in response.items() {
        writer.write_record(result_fields(query, result, fields))?;
    }
    writer.flush()?;
    Ok(response.len())
}
