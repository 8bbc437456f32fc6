use crate::config::CompressionLevel;
use crate::engine::{compress::compress_document, save};
use crate::error::ToolkitError;
use crate::output::OperationOutput;
use crate::pipeline::input::PdfSource;
use crate::progress::Operation;
use crate::toolkit::{shield, PdfToolkit};
use std::path::Path;
use tracing::{debug, info_span};

const OP: &str = "compression";

impl PdfToolkit {
    /// Compress a PDF.
    ///
    /// Content streams are re-deflated at `level` (see
    /// [`CompressionLevel::engine_level`] for the mapping), eligible images
    /// are re-encoded as JPEG at the configured image quality, and
    /// unreachable objects are dropped.
    ///
    /// # Arguments
    /// * `source` — path, bytes or stream
    /// * `dest`   — write here, or return the bytes when `None`
    /// * `level`  — 1 (fastest) to 10 (smallest)
    pub fn compress<'a>(
        &self,
        source: impl Into<PdfSource<'a>>,
        dest: Option<&Path>,
        level: CompressionLevel,
    ) -> Result<OperationOutput, ToolkitError> {
        let span = info_span!("operation", op = %Operation::Compress);
        let _enter = span.enter();

        let pdf = self.load(source.into(), OP)?;
        pdf.require_plain()?;
        debug!(
            "Using compression level: {} (engine level {})",
            level,
            level.engine_level()
        );
        self.progress()
            .on_operation_start(Operation::Compress, pdf.page_count());

        let mut doc = pdf.into_document();
        let bytes = shield(OP, || {
            compress_document(&mut doc, level.engine_level(), self.config().image_quality)?;
            save(&mut doc, OP)
        })?;

        self.finish(Operation::Compress, "Compressed PDF", bytes, dest)
    }
}
