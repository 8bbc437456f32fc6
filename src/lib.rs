//! # pdf-toolkit
//!
//! Compress, merge, encrypt, decrypt and convert PDF documents.
//!
//! ## Why this crate?
//!
//! The PDF heavy lifting (object model, stream codecs, security handlers) is
//! done by `lopdf`. What this crate adds is one uniform contract around it:
//! every operation accepts the same three input shapes, validates them the
//! same way before touching the document, and returns either the written
//! path or the produced bytes, or a typed failure.
//!
//! ## Operation Overview
//!
//! ```text
//! PdfSource (path | bytes | Read+Seek stream)
//!  │
//!  ├─ 1. Validate  exists → size ≤ 30 MiB → sniffed as application/pdf
//!  ├─ 2. Resolve   materialise bytes, restore stream cursor
//!  ├─ 3. Engine    compress │ merge │ encrypt │ decrypt │ to-excel │ to-word
//!  └─ 4. Deliver   atomic write to dest, or return bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_toolkit::{CompressionLevel, PdfToolkit};
//! use std::path::Path;
//!
//! fn main() -> Result<(), pdf_toolkit::ToolkitError> {
//!     let toolkit = PdfToolkit::default();
//!     let out = toolkit.compress(
//!         Path::new("report.pdf"),
//!         Some(Path::new("report.small.pdf")),
//!         CompressionLevel::new(7),
//!     )?;
//!     println!("written to {}", out.path().unwrap().display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-toolkit` binary (clap + anyhow + tracing-subscriber + indicatif, tokio + reqwest for the webhook log sink) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-toolkit = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod table;
pub mod toolkit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CompressionLevel, EncryptionAlgorithm, PageRange, TableDetection, ToolkitConfig,
    ToolkitConfigBuilder,
};
pub use engine::{RawTable, SpreadsheetWriter, TableExtractor, WordConverter};
pub use error::{ErrorKind, ToolkitError};
pub use output::OperationOutput;
pub use pipeline::input::{PdfSource, ReadSeek};
pub use pipeline::validate::ValidationOutcome;
pub use progress::{NoopProgress, Operation, OperationProgress, ProgressCallback};
pub use table::{ColumnLabel, CombinedTable, ExtractedTable};
pub use toolkit::PdfToolkit;
