use crate::app::ports::Fetcher;
use crate::document::Document;
use crate::error::{EtlError, Result};
use crate::locator::locate_by_class;
use crate::mappers::RowMapper;
use tracing::{info, instrument, warn};

/// A row of the list table that could not be mapped
#[derive(Debug)]
pub struct RowFailure {
    /// Position among the table body rows, header rows included
    pub row_index: usize,
    pub error: EtlError,
}

/// Result of loading one list table
#[derive(Debug)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub failures: Vec<RowFailure>,
}

/// Map every data row of the table whose class attribute is exactly `class_name`.
///
/// Rows keep document order. Rows without data cells (header rows) are
/// skipped; rows whose mapping fails are set aside in `failures`.
pub fn load_table<M: RowMapper>(document: &Document, class_name: &str, mapper: &M) -> Result<Loaded<M::Output>> {
    let table = locate_by_class(document, class_name)?;

    let mut rows = Vec::new();
    let mut failures = Vec::new();
    for (row_index, row) in table.rows.iter().enumerate() {
        let cells = row.data_cells();
        if cells.is_empty() {
            continue;
        }
        match mapper.map_row(&cells) {
            Ok(Some(mapped)) => rows.push(mapped),
            Ok(None) => {}
            Err(error) => {
                warn!(row_index, %error, "Skipping unmappable row");
                failures.push(RowFailure { row_index, error });
            }
        }
    }

    Ok(Loaded { rows, failures })
}

/// Fetch `url` and load its list table.
#[instrument(skip(fetcher, mapper))]
pub async fn load<M: RowMapper>(
    fetcher: &dyn Fetcher,
    url: &str,
    class_name: &str,
    mapper: &M,
) -> Result<Loaded<M::Output>> {
    let html = fetcher.fetch(url).await?;
    let loaded = load_table(&Document::parse(&html), class_name, mapper)?;
    info!("✅ Loaded {} rows ({} failed)", loaded.rows.len(), loaded.failures.len());
    Ok(loaded)
}
