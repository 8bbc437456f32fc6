//! Progress-callback trait for operation lifecycle events.
//!
//! Inject an [`Arc<dyn OperationProgress>`] via
//! [`crate::PdfToolkit::with_progress`] to observe long-running operations.
//! Only the page-oriented conversions report per-batch and per-page events;
//! every operation reports start and completion.
//!
//! # Why callbacks instead of channels?
//!
//! Operations are synchronous. A callback lets the host forward events to a
//! terminal bar, a log, or a channel of its own choosing without the library
//! knowing how the host communicates.
//!
//! # Example
//!
//! ```rust
//! use pdf_toolkit::{Operation, OperationProgress, PdfToolkit};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl OperationProgress for PageCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let toolkit = PdfToolkit::default()
//!     .with_progress(Arc::new(PageCounter(AtomicUsize::new(0))));
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Compress,
    Merge,
    Encrypt,
    Decrypt,
    ToExcel,
    ToWord,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::Merge => "merge",
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
            Operation::ToExcel => "to-excel",
            Operation::ToWord => "to-word",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by operations as they progress.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Callbacks run on the thread executing the
/// operation; keep them cheap.
pub trait OperationProgress: Send + Sync {
    /// Called once validation has passed and the document is loaded.
    ///
    /// # Arguments
    /// * `op`          — the running operation
    /// * `total_pages` — pages the operation will touch (0 when unknown)
    fn on_operation_start(&self, op: Operation, total_pages: usize) {
        let _ = (op, total_pages);
    }

    /// Called before a batch of pages is processed.
    ///
    /// # Arguments
    /// * `first` — 1-indexed first page of the batch
    /// * `last`  — 1-indexed last page of the batch (inclusive)
    /// * `total` — total pages being processed
    fn on_batch_start(&self, first: usize, last: usize, total: usize) {
        let _ = (first, last, total);
    }

    /// Called after each page has been processed.
    ///
    /// # Arguments
    /// * `page`  — 1-indexed page number
    /// * `total` — total pages being processed
    fn on_page_complete(&self, page: usize, total: usize) {
        let _ = (page, total);
    }

    /// Called once when the operation finished successfully.
    fn on_operation_complete(&self, op: Operation) {
        let _ = op;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgress;

impl OperationProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::PdfToolkit`].
pub type ProgressCallback = Arc<dyn OperationProgress>;
