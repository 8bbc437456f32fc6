//! The [`PdfToolkit`] facade.
//!
//! A toolkit bundles the configuration, the delegate engines and the
//! progress callback. Operations live in [`crate::ops`] as inherent methods;
//! each follows the same shape:
//!
//! ```text
//!  PdfSource ──► validate ──► resolve ──► engine (shielded) ──► deliver
//!                  │             │              │                  │
//!                  ▼             ▼              ▼                  ▼
//!           ToolkitError   bytes view     ToolkitError     Written(path) | Bytes
//! ```
//!
//! ## Why a facade instead of free functions?
//!
//! Engines are swappable. Holding them behind `Arc<dyn Trait>` in one value
//! lets a host replace, say, the table extractor once and have every
//! Convert-to-Excel call use it, while tests inject fakes the same way.

use crate::config::ToolkitConfig;
use crate::engine::docx::TextDocxConverter;
use crate::engine::tables::AlignmentTables;
use crate::engine::xlsx::XlsxWriter;
use crate::engine::{LoadedPdf, SpreadsheetWriter, TableExtractor, WordConverter};
use crate::error::ToolkitError;
use crate::output::{deliver, OperationOutput};
use crate::pipeline::input::{self, PdfSource};
use crate::pipeline::validate::{self, ValidationOutcome};
use crate::progress::{NoopProgress, Operation, OperationProgress, ProgressCallback};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Entry point for every PDF operation.
///
/// Cheap to clone: engines and the progress callback are shared.
#[derive(Clone)]
pub struct PdfToolkit {
    config: ToolkitConfig,
    tables: Arc<dyn TableExtractor>,
    word: Arc<dyn WordConverter>,
    spreadsheet: Arc<dyn SpreadsheetWriter>,
    progress: ProgressCallback,
}

impl PdfToolkit {
    /// Toolkit with the built-in engines.
    pub fn new(config: ToolkitConfig) -> Self {
        Self {
            tables: Arc::new(AlignmentTables::new(config.tables)),
            word: Arc::new(TextDocxConverter::new(config.tables)),
            spreadsheet: Arc::new(XlsxWriter),
            progress: Arc::new(NoopProgress),
            config,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_table_extractor(mut self, tables: Arc<dyn TableExtractor>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_word_converter(mut self, word: Arc<dyn WordConverter>) -> Self {
        self.word = word;
        self
    }

    pub fn with_spreadsheet_writer(mut self, spreadsheet: Arc<dyn SpreadsheetWriter>) -> Self {
        self.spreadsheet = spreadsheet;
        self
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// Run the validator alone: existence, size, then content sniff.
    pub fn validate<'a>(&self, source: impl Into<PdfSource<'a>>) -> ValidationOutcome {
        let mut source = source.into();
        validate::check(&mut source, &self.config)
    }

    // ── Shared operation plumbing ────────────────────────────────────────

    pub(crate) fn progress(&self) -> &dyn OperationProgress {
        self.progress.as_ref()
    }

    pub(crate) fn table_extractor(&self) -> &dyn TableExtractor {
        self.tables.as_ref()
    }

    pub(crate) fn word_converter(&self) -> &dyn WordConverter {
        self.word.as_ref()
    }

    pub(crate) fn spreadsheet_writer(&self) -> &dyn SpreadsheetWriter {
        self.spreadsheet.as_ref()
    }

    /// Validate, materialise and parse one source.
    pub(crate) fn load(
        &self,
        source: PdfSource<'_>,
        operation: &'static str,
    ) -> Result<LoadedPdf, ToolkitError> {
        let bytes = self.read(source)?;
        shield(operation, || LoadedPdf::parse(&bytes, operation))
    }

    /// Validate and materialise one source without parsing it.
    pub(crate) fn read<'a>(&self, source: PdfSource<'a>) -> Result<Cow<'a, [u8]>, ToolkitError> {
        input::resolve(source, &self.config).inspect_err(|e| {
            if e.is_validation() {
                error!("Validation failed: {}", e);
            }
        })
    }

    /// Hand the result to the caller and report completion.
    pub(crate) fn finish(
        &self,
        op: Operation,
        label: &str,
        bytes: Vec<u8>,
        dest: Option<&Path>,
    ) -> Result<OperationOutput, ToolkitError> {
        let output = deliver(bytes, dest)?;
        if let Some(path) = output.path() {
            info!("{} saved to: {}", label, path.display());
        }
        info!("{} completed successfully", op);
        self.progress.on_operation_complete(op);
        Ok(output)
    }
}

impl Default for PdfToolkit {
    fn default() -> Self {
        Self::new(ToolkitConfig::default())
    }
}

impl fmt::Debug for PdfToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfToolkit")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run a delegate call, turning a panic into [`ToolkitError::Engine`].
pub(crate) fn shield<T>(
    operation: &'static str,
    f: impl FnOnce() -> Result<T, ToolkitError>,
) -> Result<T, ToolkitError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let detail = format!("engine panicked: {}", panic_message(payload.as_ref()));
        error!("{}", detail);
        Err(ToolkitError::engine(operation, detail))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
