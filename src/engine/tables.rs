//! Alignment-based table detection.
//!
//! A table is a vertical block of consecutive text lines that split into the
//! same number of cells (at least two), with every column lined up from
//! row to row:
//!
//! ```text
//!   Name        Age     City        ◄─ 3 cells ┐
//!   Ann         31      Oslo        ◄─ 3 cells ├─ one table
//!   Bob         40      Rome        ◄─ 3 cells ┘
//!
//!   Some running paragraph text     ◄─ 1 cell, ends the block
//! ```
//!
//! A column lines up when the left edges, right edges or centres of the
//! cells stay within `column_tolerance` of the block's first row. That
//! covers left-aligned text as well as right-aligned numbers.

use crate::config::TableDetection;
use crate::engine::text::{self, Cell, TextLine};
use crate::engine::{LoadedPdf, RawTable, TableExtractor};
use crate::error::ToolkitError;
use tracing::trace;

/// The built-in [`TableExtractor`].
#[derive(Debug, Clone, Default)]
pub struct AlignmentTables {
    settings: TableDetection,
}

impl AlignmentTables {
    pub fn new(settings: TableDetection) -> Self {
        Self { settings }
    }
}

impl TableExtractor for AlignmentTables {
    fn extract_tables(
        &self,
        pdf: &LoadedPdf,
        page_index: usize,
    ) -> Result<Vec<RawTable>, ToolkitError> {
        let page_id = pdf
            .page_id(page_index)
            .ok_or(ToolkitError::PageOutOfRange {
                page: page_index,
                total: pdf.page_count(),
            })?;
        let runs = text::page_runs(pdf.document(), page_id)?;
        let lines = text::group_lines(runs, self.settings.row_tolerance);
        let tables = detect(&lines, &self.settings);
        trace!("Page {}: {} tables", page_index + 1, tables.len());
        Ok(tables)
    }
}

/// Find every table in `lines` (top to bottom).
pub fn detect(lines: &[TextLine], settings: &TableDetection) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<Cell>> = Vec::new();

    for line in lines {
        let cells = line.cells(settings.cell_gap);
        let continues = match block.first() {
            Some(first) => aligned(first, &cells, settings.column_tolerance),
            None => false,
        };
        if !continues {
            flush(&mut block, &mut tables, settings.min_rows);
            if cells.len() < 2 {
                continue;
            }
        }
        block.push(cells);
    }
    flush(&mut block, &mut tables, settings.min_rows);
    tables
}

fn flush(block: &mut Vec<Vec<Cell>>, tables: &mut Vec<RawTable>, min_rows: usize) {
    if block.len() >= min_rows.max(1) {
        tables.push(
            block
                .drain(..)
                .map(|row| row.into_iter().map(|c| c.text).collect())
                .collect(),
        );
    }
    block.clear();
}

fn aligned(reference: &[Cell], row: &[Cell], tolerance: f32) -> bool {
    reference.len() == row.len()
        && reference.iter().zip(row).all(|(a, b)| {
            (a.x - b.x).abs() <= tolerance
                || (a.right - b.right).abs() <= tolerance
                || ((a.x + a.right) / 2.0 - (b.x + b.right) / 2.0).abs() <= tolerance
        })
}
