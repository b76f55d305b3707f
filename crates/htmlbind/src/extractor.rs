//! Extractors turn a bound selection into the raw text that gets coerced.

use crate::document::Selection;
use crate::error::{ScanError, ScanResult};

/// How a node pulls its raw value out of its selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extractor {
    /// Direct text of the matched nodes, nested elements excluded.
    Text,
    /// Inner markup of the first matched node.
    Html,
    /// The named attribute of the first matched node.
    Attr(String),
}

impl Extractor {
    pub fn extract(&self, selection: &Selection<'_>) -> ScanResult<String> {
        match self {
            Extractor::Text => extract_text(selection),
            Extractor::Html => extract_html(selection),
            Extractor::Attr(name) => extract_attr(selection, name),
        }
    }
}

pub fn extract_text(selection: &Selection<'_>) -> ScanResult<String> {
    Ok(selection.own_text())
}

pub fn extract_html(selection: &Selection<'_>) -> ScanResult<String> {
    Ok(selection.inner_html())
}

pub fn extract_attr(selection: &Selection<'_>, name: &str) -> ScanResult<String> {
    selection
        .attr(name)
        .ok_or_else(|| ScanError::AttributeNotFound(name.to_string()))
}
