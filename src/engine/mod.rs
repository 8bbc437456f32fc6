//! Delegate engines.
//!
//! The operations in [`crate::ops`] never touch the PDF object model
//! directly. They go through this module, which wraps `lopdf` for parsing,
//! rewriting and saving, and defines the narrow seams where a different
//! engine can be plugged in:
//!
//! | Seam                  | Call                               | Built-in                      |
//! |-----------------------|------------------------------------|-------------------------------|
//! | [`LoadedPdf`]         | parse bytes → page collection      | `lopdf::Document`             |
//! | [`TableExtractor`]    | extract tables from a page         | [`tables::AlignmentTables`]   |
//! | [`WordConverter`]     | convert file range to DOCX         | [`docx::TextDocxConverter`]   |
//! | [`SpreadsheetWriter`] | write rows to a spreadsheet        | [`xlsx::XlsxWriter`]          |
//!
//! Engines report failures as [`ToolkitError`], usually
//! [`ToolkitError::Engine`]; they never panic on malformed input on purpose,
//! but the operation layer still catches panics as a last line.

pub mod compress;
pub mod crypto;
pub mod docx;
pub mod merge;
pub mod ooxml;
pub mod tables;
pub mod text;
pub mod xlsx;

use crate::error::ToolkitError;
use crate::progress::OperationProgress;
use crate::table::CombinedTable;
use lopdf::{Document, ObjectId};
use std::path::Path;

/// Rows of cell strings, as produced by a [`TableExtractor`].
pub type RawTable = Vec<Vec<String>>;

/// Extracts every table on one page, in detection order.
pub trait TableExtractor: Send + Sync {
    /// # Arguments
    /// * `pdf`        — the parsed document
    /// * `page_index` — 0-based page index
    fn extract_tables(&self, pdf: &LoadedPdf, page_index: usize)
        -> Result<Vec<RawTable>, ToolkitError>;
}

/// Converts an inclusive page range of an on-disk PDF into a DOCX file.
///
/// Path-based on purpose: converters of this kind usually wrap tools that
/// only accept files.
pub trait WordConverter: Send + Sync {
    /// # Arguments
    /// * `pdf_path`  — source PDF
    /// * `docx_path` — file to create
    /// * `first`     — 0-based first page
    /// * `last`      — 0-based last page (inclusive)
    /// * `progress`  — receives one `on_page_complete` per converted page
    fn convert(
        &self,
        pdf_path: &Path,
        docx_path: &Path,
        first: usize,
        last: usize,
        progress: &dyn OperationProgress,
    ) -> Result<(), ToolkitError>;
}

/// Serialises a combined table into spreadsheet bytes.
pub trait SpreadsheetWriter: Send + Sync {
    fn write(&self, table: &CombinedTable) -> Result<Vec<u8>, ToolkitError>;
}

// ── Parsed document ──────────────────────────────────────────────────────

/// A parsed PDF plus its page list in document order.
pub struct LoadedPdf {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl LoadedPdf {
    /// Parse `bytes`. Parse failures are reported against `operation`.
    pub fn parse(bytes: &[u8], operation: &'static str) -> Result<Self, ToolkitError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ToolkitError::engine(operation, format!("failed to parse PDF: {e}")))?;
        Ok(Self::from_document(doc))
    }

    /// Load from disk. Used by path-based engines.
    pub fn open(path: &Path, operation: &'static str) -> Result<Self, ToolkitError> {
        let doc = Document::load(path).map_err(|e| {
            ToolkitError::engine(
                operation,
                format!("failed to open '{}': {e}", path.display()),
            )
        })?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Object ID of the page at `index` (0-based).
    pub fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.pages.get(index).copied()
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Fail with [`ToolkitError::Encrypted`] unless the document is plain.
    pub fn require_plain(&self) -> Result<(), ToolkitError> {
        if self.is_encrypted() {
            return Err(ToolkitError::Encrypted);
        }
        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }
}

/// Serialise `doc` to bytes.
pub fn save(doc: &mut Document, operation: &'static str) -> Result<Vec<u8>, ToolkitError> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ToolkitError::engine(operation, format!("failed to save PDF: {e}")))?;
    Ok(buf)
}

/// Names listed in a stream's `/Filter` entry, outermost first.
pub(crate) fn stream_filters(dict: &lopdf::Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(lopdf::Object::Name(n)) => vec![n.clone()],
        Ok(lopdf::Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}
