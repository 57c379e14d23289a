//! Read-only grid view over a dataset's attribute table.
//!
//! A grid surface only needs four things from its source: how many rows,
//! how many columns, the text of a cell and the text of a header. Any table
//! that can answer those implements [`TableSource`].

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::model::GeoDataset;

/// Name of the trailing column that shows each record's geometry.
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Minimal read-only table capability used by grid displays.
///
/// `cell` and `header` expect in-range indices; callers iterate
/// `0..row_count()` and `0..column_count()`. Indexing outside those bounds
/// is a caller bug and panics.
pub trait TableSource {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    fn cell(&self, row: usize, col: usize) -> String;

    fn header(&self, col: usize) -> &str;

    fn headers(&self) -> Vec<&str> {
        (0..self.column_count()).map(|col| self.header(col)).collect()
    }

    fn row(&self, row: usize) -> Vec<String> {
        (0..self.column_count()).map(|col| self.cell(row, col)).collect()
    }

    /// Display width per column, the widest of the header and the first
    /// `sample_rows` cells, capped at `max_width` terminal columns.
    fn column_widths(&self, max_width: usize, sample_rows: usize) -> Vec<usize> {
        let rows = self.row_count().min(sample_rows);
        (0..self.column_count())
            .map(|col| {
                (0..rows)
                    .map(|row| display_width(&self.cell(row, col)))
                    .chain(std::iter::once(display_width(self.header(col))))
                    .max()
                    .unwrap_or(0)
                    .min(max_width)
            })
            .collect()
    }
}

/// Terminal columns taken by `text`. Wide characters such as CJK count two.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Fits `text` into exactly `width` terminal columns: cut with `...` when
/// too wide, padded with spaces otherwise.
pub fn fit_cell(text: &str, width: usize) -> String {
    let mut cell = if display_width(text) <= width {
        text.to_string()
    } else {
        let budget = width.saturating_sub(3);
        let mut used = 0;
        let mut cut = String::new();
        for c in text.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > budget {
                break;
            }
            used += w;
            cut.push(c);
        }
        cut.push_str(&".".repeat(width.min(3)));
        cut
    };
    let padding = width.saturating_sub(display_width(&cell));
    cell.extend(std::iter::repeat(' ').take(padding));
    cell
}

/// Attribute table of the current dataset, attributes first and then the
/// geometry as WKT. With no dataset it is an empty 0x0 table.
#[derive(Debug, Clone, Copy)]
pub struct AttributeTable<'a> {
    dataset: Option<&'a GeoDataset>,
}

impl<'a> AttributeTable<'a> {
    pub fn new(dataset: Option<&'a GeoDataset>) -> Self {
        Self { dataset }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

impl TableSource for AttributeTable<'_> {
    fn row_count(&self) -> usize {
        self.dataset.map_or(0, GeoDataset::len)
    }

    fn column_count(&self) -> usize {
        self.dataset.map_or(0, |d| d.columns().len() + 1)
    }

    fn cell(&self, row: usize, col: usize) -> String {
        let dataset = self.dataset.expect("cell() called on an empty table");
        if col == dataset.columns().len() {
            dataset.records()[row].geometry_wkt().unwrap_or_default()
        } else {
            dataset.value(row, col).to_string()
        }
    }

    fn header(&self, col: usize) -> &str {
        let dataset = self.dataset.expect("header() called on an empty table");
        if col == dataset.columns().len() {
            GEOMETRY_COLUMN
        } else {
            &dataset.columns()[col].name
        }
    }
}
