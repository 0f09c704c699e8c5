//! Turning rendered HTML tables into labeled tables.
//!
//! [`build_table`] is the pure part: header labels plus raw cell text in,
//! validated [`Table`] out. [`scrape_table`] reads the text out of the page
//! and hands it to `build_table`.

use crate::element::Element;
use crate::errors::{AutomationError, TimesaverError};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use tracing::debug;

/// Rectangular table with labeled columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Table with a schema and no rows
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting rows whose arity differs from the header
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self, TimesaverError> {
        check_arity("table", &columns, rows.iter().enumerate())?;
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// Every cell of the column labeled `label`, top to bottom
    pub fn column(&self, label: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == label)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }
}

/// One table row viewed as a label -> cell mapping
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [String],
}

impl<'a> Row<'a> {
    pub fn get(&self, label: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c == label)?;
        self.cells.get(idx).map(String::as_str)
    }

    pub fn cells(&self) -> &'a [String] {
        self.cells
    }

    /// `(label, cell)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(String::as_str))
    }
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (label, cell) in self.iter() {
            map.serialize_entry(label, cell)?;
        }
        map.end()
    }
}

/// Serialized as a list of row objects, keys in column order
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.iter() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

fn check_arity<'r>(
    name: &str,
    columns: &[String],
    rows: impl Iterator<Item = (usize, &'r Vec<String>)>,
) -> Result<(), TimesaverError> {
    for (row, cells) in rows {
        if cells.len() != columns.len() {
            return Err(TimesaverError::ExtractionShape {
                table: name.to_string(),
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }
    }
    Ok(())
}

/// Trim and collapse runs of whitespace (including non-breaking spaces).
/// Used for labels; table cells are only trimmed.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_content(cells: &[String]) -> bool {
    cells.iter().any(|c| !c.is_empty())
}

/// Build a table from scraped header labels and raw row cells.
///
/// Rows whose cells are all empty are dropped. Every remaining row must
/// have exactly one cell per column.
pub fn build_table(
    name: &str,
    columns: Vec<String>,
    raw_rows: Vec<Vec<String>>,
) -> Result<Table, TimesaverError> {
    if raw_rows.is_empty() {
        return Ok(Table::empty(columns));
    }

    let kept: Vec<(usize, Vec<String>)> = raw_rows
        .into_iter()
        .enumerate()
        .filter(|(_, cells)| has_content(cells))
        .collect();
    check_arity(name, &columns, kept.iter().map(|(i, cells)| (*i, cells)))?;

    Ok(Table {
        columns,
        rows: kept.into_iter().map(|(_, cells)| cells).collect(),
    })
}

/// Where the parts of a rendered table are, relative to the table element
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    pub name: &'static str,
    pub header_cells: &'static str,
    pub rows: &'static str,
    pub cells: &'static str,
}

/// Read a rendered table into a [`Table`]
pub fn scrape_table(table: &Element, layout: &TableLayout) -> Result<Table, TimesaverError> {
    scrape_table_marked(table, layout, |_| Ok(false)).map(|(table, _)| table)
}

/// Read a rendered table and report which kept row, if any, `is_marked`
/// picks out (e.g. the highlighted row of a selection grid).
pub fn scrape_table_marked<F>(
    table: &Element,
    layout: &TableLayout,
    is_marked: F,
) -> Result<(Table, Option<usize>), TimesaverError>
where
    F: Fn(&Element) -> Result<bool, AutomationError>,
{
    let columns = table
        .find_many(layout.header_cells)?
        .iter()
        .map(|h| h.text().map(|t| t.trim().to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut raw_rows = Vec::new();
    let mut marks = Vec::new();
    for row in table.find_many(layout.rows)? {
        let cells = row
            .find_many(layout.cells)?
            .iter()
            .map(|c| c.text().map(|t| t.trim().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        marks.push(is_marked(&row)?);
        raw_rows.push(cells);
    }
    debug!(
        table = layout.name,
        columns = columns.len(),
        rows = raw_rows.len(),
        "Scraped table"
    );

    let marked = raw_rows
        .iter()
        .zip(&marks)
        .filter(|(cells, _)| has_content(cells))
        .position(|(_, marked)| *marked);
    Ok((build_table(layout.name, columns, raw_rows)?, marked))
}
