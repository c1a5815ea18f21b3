//! Owned view of the tables in an HTML page.
//!
//! `scraper::Html` is not `Send`, so pages are parsed and flattened into plain
//! values right away and never held across an `.await`.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static TBODY: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellKind {
    Header,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub kind: CellKind,
    pub text: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn has_header(&self) -> bool {
        self.cells.iter().any(|c| c.kind == CellKind::Header)
    }

    pub fn data_cells(&self) -> Vec<&Cell> {
        self.cells.iter().filter(|c| c.kind == CellKind::Data).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Raw class attribute, exactly as written in the page
    pub class: Option<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Whitespace-separated tokens of the class attribute.
    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.class.as_deref().unwrap_or_default().split_whitespace()
    }

    /// All cells of the table body in document order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }
}

/// Every table of a page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub tables: Vec<Table>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let page = Html::parse_document(html);
        let tables = page.select(&TABLE).map(extract_table).collect();
        Self { tables }
    }
}

fn extract_table(table: ElementRef) -> Table {
    let class = table.value().attr("class").map(|c| c.to_string());
    // html5ever inserts a tbody when the markup has none
    let rows = match table.select(&TBODY).next() {
        Some(body) => body.select(&ROW).map(extract_row).collect(),
        None => Vec::new(),
    };
    Table { class, rows }
}

fn extract_row(row: ElementRef) -> Row {
    let cells = row
        .select(&CELL)
        .map(|cell| {
            let kind = if cell.value().name() == "th" {
                CellKind::Header
            } else {
                CellKind::Data
            };
            let links = cell
                .select(&LINK)
                .map(|a| Link {
                    text: a.text().collect::<String>().trim().to_string(),
                    href: a.value().attr("href").map(|h| h.to_string()),
                })
                .collect();
            Cell {
                kind,
                text: cell.text().collect::<String>(),
                links,
            }
        })
        .collect();
    Row { cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tables_rows_and_links() {
        let html = r#"
            <html><body>
              <table class="wikitable sortable">
                <tbody>
                  <tr><th>Name</th><th>City</th></tr>
                  <tr>
                    <td><a href="/wiki/Louvre">Louvre</a></td>
                    <td><a href="/wiki/France"><img alt="flag"></a> <a href="/wiki/Paris">Paris</a></td>
                  </tr>
                </tbody>
              </table>
              <table><tr><td>bare</td></tr></table>
            </body></html>
        "#;

        let doc = Document::parse(html);
        assert_eq!(doc.tables.len(), 2);

        let first = &doc.tables[0];
        assert_eq!(first.class.as_deref(), Some("wikitable sortable"));
        assert_eq!(first.class_tokens().collect::<Vec<_>>(), vec!["wikitable", "sortable"]);
        assert_eq!(first.rows.len(), 2);
        assert!(first.rows[0].has_header());
        assert!(first.rows[0].data_cells().is_empty());

        let data = first.rows[1].data_cells();
        assert_eq!(data[0].text, "Louvre");
        assert_eq!(data[1].links.len(), 2);
        assert_eq!(data[1].links[1].href.as_deref(), Some("/wiki/Paris"));

        // Implicit tbody still yields rows
        let second = &doc.tables[1];
        assert!(second.class.is_none());
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.rows[0].cells[0].text, "bare");
    }

    #[test]
    fn test_cells_in_document_order() {
        let html = r#"<table><tr><th>A</th><td>1</td></tr><tr><td>2</td></tr></table>"#;
        let doc = Document::parse(html);
        let texts: Vec<_> = doc.tables[0].cells().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "1", "2"]);
    }

    #[test]
    fn test_page_without_tables() {
        assert!(Document::parse("<p>nothing here</p>").tables.is_empty());
    }
}
