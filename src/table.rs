//! Tabular data produced by Convert-to-Excel.
//!
//! ```text
//!  page 1: [[Name, Age], [Ann, 31]]   ──► ExtractedTable { Name | Age }
//!  page 2: [[Bob, 40]]                ──► ExtractedTable {  0   |  1  }
//!                                              │
//!                                              ▼  CombinedTable::concat
//!                           Name | Age |  0  |  1
//!                           Ann  | 31  |     |
//!                                |     | Bob | 40
//! ```
//!
//! A table with more than one row takes its first row as the header. A
//! single-row table has no header and its columns are labelled by position.
//! Combining unions the labels in first-seen order; cells a table does not
//! have stay blank.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Column label: a header cell, or a position for header-less tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ColumnLabel {
    Named(String),
    Index(usize),
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLabel::Named(name) => f.write_str(name),
            ColumnLabel::Index(i) => write!(f, "{i}"),
        }
    }
}

/// One table as detected on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedTable {
    pub columns: Vec<ColumnLabel>,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    /// Build from raw rows. Ragged rows are padded to the widest row.
    pub fn from_rows(mut raw: Vec<Vec<String>>) -> Self {
        let width = raw.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut raw {
            row.resize(width, String::new());
        }

        if raw.len() > 1 {
            let header = raw.remove(0);
            Self {
                columns: unique_names(header),
                rows: raw,
            }
        } else {
            Self {
                columns: (0..width).map(ColumnLabel::Index).collect(),
                rows: raw,
            }
        }
    }

    pub fn is_headed(&self) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(c, ColumnLabel::Named(_)))
    }
}

/// Header cells with repeats disambiguated as `name.1`, `name.2`, ...
fn unique_names(header: Vec<String>) -> Vec<ColumnLabel> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .into_iter()
        .map(|name| {
            let name = name.trim().to_string();
            let count = seen.entry(name.clone()).or_insert(0);
            let label = if *count == 0 {
                name.clone()
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            ColumnLabel::Named(label)
        })
        .collect()
}

/// Every extracted table stacked into one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedTable {
    pub columns: Vec<ColumnLabel>,
    pub rows: Vec<Vec<String>>,
}

impl CombinedTable {
    /// Stack `tables` in order, aligning cells by column label.
    pub fn concat(tables: &[ExtractedTable]) -> Self {
        let mut columns: Vec<ColumnLabel> = Vec::new();
        let mut index: HashMap<ColumnLabel, usize> = HashMap::new();
        for table in tables {
            for label in &table.columns {
                if !index.contains_key(label) {
                    index.insert(label.clone(), columns.len());
                    columns.push(label.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.rows.len()).sum());
        for table in tables {
            let slots: Vec<usize> = table.columns.iter().map(|l| index[l]).collect();
            for row in &table.rows {
                let mut out = vec![String::new(); columns.len()];
                for (cell, &slot) in row.iter().zip(&slots) {
                    out[slot] = cell.clone();
                }
                rows.push(out);
            }
        }

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}
