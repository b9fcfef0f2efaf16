use crate::domain::model::{Record, Table};
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};

const NAME_CELL: usize = 1;
const VALUE_CELL: usize = 2;
const MIN_CELLS: usize = VALUE_CELL + 1;

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// One `<td>` reduced to what row filtering and record building need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    /// All text inside the cell, trimmed.
    pub text: String,
    /// First non-blank text node directly under the cell, trimmed. Footnote
    /// markers and other trailing markup are not part of it.
    pub leading_text: String,
    pub has_link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<RawCell>,
}

pub type RowPredicate = fn(&RawRow) -> bool;

/// A real ranking row has the rank, name and value cells, and the name cell links
/// to the entity's article. Header, footer and ad rows fail one of the two checks.
pub fn is_data_row(row: &RawRow) -> bool {
    row.cells.len() >= MIN_CELLS && row.cells[NAME_CELL].has_link
}

#[derive(Debug, Clone)]
pub struct Extractor {
    columns: Vec<String>,
    heading: Option<String>,
    predicate: RowPredicate,
}

impl Extractor {
    pub fn new(expected_columns: Vec<String>) -> Result<Self> {
        if expected_columns.len() != 2 {
            return Err(EtlError::parse(format!(
                "Expected a name and a value column, got {:?}",
                expected_columns
            )));
        }
        Ok(Self {
            columns: expected_columns,
            heading: None,
            predicate: is_data_row,
        })
    }

    /// Only consider tables that come after a heading containing this text.
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn with_predicate(mut self, predicate: RowPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn extract(&self, source: &str) -> Result<Table<Record>> {
        let rows = raw_rows(source, self.heading.as_deref())?;
        let total = rows.len();

        let mut table = Table::new(self.columns.clone());
        for row in rows.into_iter().filter(|row| (self.predicate)(row)) {
            // The predicate may be looser than is_data_row; never index past the row.
            let (Some(name), Some(value)) = (row.cells.get(NAME_CELL), row.cells.get(VALUE_CELL))
            else {
                continue;
            };
            table.push(Record {
                name: name.text.clone(),
                market_cap_usd: value.leading_text.clone(),
            });
        }

        tracing::debug!("Kept {} of {} table rows", table.len(), total);

        if table.is_empty() {
            return Err(EtlError::parse(
                "No qualifying rows found in the ranked table",
            ));
        }
        Ok(table)
    }
}

pub fn extract(source: &str, expected_columns: &[String]) -> Result<Table<Record>> {
    Extractor::new(expected_columns.to_vec())?.extract(source)
}

/// Every `<tr>` of the selected table body, in document order, before any filtering.
pub fn raw_rows(source: &str, heading: Option<&str>) -> Result<Vec<RawRow>> {
    let document = Html::parse_document(source);
    let body = select_table_body(&document, heading)?;

    let tr = selector("tr")?;
    let td = selector("td")?;
    let link = selector("a")?;

    Ok(body
        .select(&tr)
        .map(|row| RawRow {
            cells: row
                .select(&td)
                .map(|cell| RawCell {
                    text: cell_text(cell),
                    leading_text: leading_text(cell),
                    has_link: cell.select(&link).next().is_some(),
                })
                .collect(),
        })
        .collect())
}

fn select_table_body<'a>(document: &'a Html, heading: Option<&str>) -> Result<ElementRef<'a>> {
    if let Some(heading) = heading {
        let needle = heading.to_lowercase();
        let mut heading_seen = false;

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            let name = element.value().name();
            if !heading_seen
                && HEADINGS.contains(&name)
                && cell_text(element).to_lowercase().contains(&needle)
            {
                heading_seen = true;
            } else if heading_seen && name == "tbody" {
                return Ok(element);
            }
        }

        return Err(EtlError::parse(format!(
            "No table found under heading '{}'",
            heading
        )));
    }

    let tbody = selector("tbody")?;
    document
        .select(&tbody)
        .next()
        .ok_or_else(|| EtlError::parse("Document contains no table body"))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::parse(format!("Bad selector '{}': {}", css, e)))
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn leading_text(cell: ElementRef<'_>) -> String {
    cell.children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| cell_text(cell))
}
