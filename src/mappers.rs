use crate::constants::{UNKNOWN_CITY_NAME, UNKNOWN_POPULATION};
use crate::document::Cell;
use crate::error::{EtlError, Result};
use crate::normalize::{normalize_cell, normalize_number, normalize_text};
use crate::types::{CityRecord, MuseumRecord};

/// Maps the data cells of one table row to a typed record.
///
/// `Ok(None)` means the row produced no columns and is dropped.
pub trait RowMapper: Send + Sync {
    type Output;

    fn map_row(&self, cells: &[&Cell]) -> Result<Option<Self::Output>>;
}

/// Columns of the most-visited museums table:
/// name, city, visitors per year, year reported.
pub struct MuseumColumns {
    site_origin: String,
}

impl MuseumColumns {
    pub fn new(site_origin: impl Into<String>) -> Self {
        Self {
            site_origin: site_origin.into(),
        }
    }

    fn link(&self, cells: &[&Cell], column: usize, index: usize) -> Result<String> {
        let href = cell(cells, column)?
            .links
            .get(index)
            .and_then(|l| l.href.as_deref())
            .ok_or(EtlError::MissingLink { column, index })?;
        Ok(format!("{}{}", self.site_origin, href))
    }
}

impl RowMapper for MuseumColumns {
    type Output = MuseumRecord;

    fn map_row(&self, cells: &[&Cell]) -> Result<Option<MuseumRecord>> {
        if cells.is_empty() {
            return Ok(None);
        }
        Ok(Some(MuseumRecord {
            name: normalize_text(text(cells, 0)?, false)?,
            wiki_link: self.link(cells, 0, 0)?,
            city: normalize_text(text(cells, 1)?, false)?,
            // The first link in the city cell is the country flag
            city_link: self.link(cells, 1, 1)?,
            visitors_per_year: normalize_cell(text(cells, 2)?, false)?.into_integer()?,
            year_reported: normalize_cell(text(cells, 3)?, false)?.into_integer()?,
        }))
    }
}

/// Columns of the largest cities table: name first, population in the sixth column.
pub struct CityColumns;

impl RowMapper for CityColumns {
    type Output = CityRecord;

    fn map_row(&self, cells: &[&Cell]) -> Result<Option<CityRecord>> {
        if cells.is_empty() {
            return Ok(None);
        }

        let mut city_name = normalize_text(text(cells, 0)?, true)?;
        if city_name.is_empty() {
            city_name = UNKNOWN_CITY_NAME.to_string();
        }

        let population = normalize_text(text(cells, 5)?, true)?;
        let population = if population.is_empty() {
            UNKNOWN_POPULATION
        } else {
            normalize_number(&population)?
        };

        Ok(Some(CityRecord {
            city_name,
            population: Some(population),
        }))
    }
}

fn cell<'a>(cells: &[&'a Cell], column: usize) -> Result<&'a Cell> {
    cells.get(column).copied().ok_or(EtlError::MissingCell(column))
}

fn text<'a>(cells: &[&'a Cell], column: usize) -> Result<&'a str> {
    Ok(cell(cells, column)?.text.trim())
}
