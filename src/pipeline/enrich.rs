//! Per-record page lookups: museum characteristics and city population backfill.
//!
//! Both stages fetch one page per key with bounded concurrency and return one
//! outcome per key, in input order; a failing page never affects the others.

use crate::app::ports::Fetcher;
use crate::constants::{INFOBOX_TOKENS, POPULATION_HEADER};
use crate::document::{Cell, CellKind, Document};
use crate::error::{EtlError, Result};
use crate::locator::locate;
use crate::normalize::{looks_numeric, normalize_number, normalize_text};
use crate::types::Facts;
use futures::stream::{self, StreamExt};
use tracing::debug;

/// Outcome of one keyed lookup
pub type KeyedOutcome<T> = (String, Result<T>);

/// Fact rows of the page's infobox: every row carrying both a header and a data cell.
pub fn extract_facts(document: &Document) -> Result<Facts> {
    let table = locate(document, &INFOBOX_TOKENS)?;

    table
        .rows
        .iter()
        .filter(|row| row.has_header() && !row.data_cells().is_empty())
        .map(|row| {
            row.cells
                .iter()
                .filter(|cell| !cell.text.trim().is_empty())
                .map(clean_fact)
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

fn clean_fact(cell: &Cell) -> Result<String> {
    let text = cell.text.trim();
    if cell.kind == CellKind::Data && looks_numeric(text) {
        if let Ok(n) = normalize_number(text) {
            return Ok(n.to_string());
        }
    }
    normalize_text(text, true)
}

/// Population from a city page's infobox.
///
/// Each header mentioning "Population" points at the next data cell in
/// document order; the last such header on the table wins.
pub fn extract_population(document: &Document, page_url: &str) -> Result<i64> {
    let table = locate(document, &INFOBOX_TOKENS)?;
    let cells: Vec<&Cell> = table.cells().collect();

    let mut population = None;
    for (i, cell) in cells.iter().enumerate() {
        if cell.kind == CellKind::Header && cell.text.contains(POPULATION_HEADER) {
            if let Some(value) = cells[i + 1..].iter().find(|c| c.kind == CellKind::Data) {
                population = Some(value.text.as_str());
            }
        }
    }

    let text = population.ok_or_else(|| EtlError::MissingPopulation(page_url.to_string()))?;
    normalize_number(text)
}

async fn fetch_facts(fetcher: &dyn Fetcher, url: &str) -> Result<Facts> {
    let html = fetcher.fetch(url).await?;
    extract_facts(&Document::parse(&html))
}

async fn fetch_population(fetcher: &dyn Fetcher, url: &str) -> Result<i64> {
    let html = fetcher.fetch(url).await?;
    extract_population(&Document::parse(&html), url)
}

/// Fetch the fact table for each `(museum name, page url)` pair.
pub async fn fetch_characteristics(
    fetcher: &dyn Fetcher,
    targets: Vec<(String, String)>,
    concurrency: usize,
) -> Vec<KeyedOutcome<Facts>> {
    stream::iter(targets.into_iter().map(|(name, url)| async move {
        let result = fetch_facts(fetcher, &url).await;
        debug!(museum = %name, ok = result.is_ok(), "characteristics lookup finished");
        (name, result)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}

/// Fetch the population for each `(city name, page url)` pair.
pub async fn fetch_populations(
    fetcher: &dyn Fetcher,
    targets: Vec<(String, String)>,
    concurrency: usize,
) -> Vec<KeyedOutcome<i64>> {
    stream::iter(targets.into_iter().map(|(city, url)| async move {
        let result = fetch_population(fetcher, &url).await;
        debug!(city = %city, ok = result.is_ok(), "population lookup finished");
        (city, result)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}
