//! Picking the right table out of a page.
//!
//! Two independent modes: scored selection by class-token overlap (for
//! infobox-like tables on individual pages) and exact class-attribute match
//! (for the list pages).

use crate::document::{Document, Table};
use crate::error::{EtlError, Result};
use tracing::debug;

/// Number of target tokens present in the table's class tokens.
pub fn score<S: AsRef<str>>(table: &Table, target_tokens: &[S]) -> usize {
    target_tokens
        .iter()
        .map(|token| token.as_ref())
        .filter(|token: &&str| table.class_tokens().any(|c| c == *token))
        .count()
}

/// Select the table with the highest overlap score.
///
/// Ranking is `(score, position)`, so among tables sharing the top score the
/// one appearing last in the document wins. Tables scoring zero remain
/// candidates; only a page without tables fails.
pub fn locate<'a, S: AsRef<str>>(document: &'a Document, target_tokens: &[S]) -> Result<&'a Table> {
    let (position, best, top_score) = document
        .tables
        .iter()
        .enumerate()
        .map(|(i, t)| (i, t, score(t, target_tokens)))
        .max_by_key(|(i, _, s)| (*s, *i))
        .ok_or_else(|| EtlError::NoMatchingTable("document contains no tables".to_string()))?;

    debug!(position, score = top_score, tables = document.tables.len(), "located table");
    Ok(best)
}

/// Select the first table whose class attribute equals `class_name` exactly.
pub fn locate_by_class<'a>(document: &'a Document, class_name: &str) -> Result<&'a Table> {
    document
        .tables
        .iter()
        .find(|t| t.class.as_deref() == Some(class_name))
        .ok_or_else(|| EtlError::NoMatchingTable(format!("no table with class \"{class_name}\"")))
}
