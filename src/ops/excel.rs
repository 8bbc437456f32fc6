use crate::error::ToolkitError;
use crate::output::OperationOutput;
use crate::pipeline::input::PdfSource;
use crate::progress::Operation;
use crate::table::{CombinedTable, ExtractedTable};
use crate::toolkit::{shield, PdfToolkit};
use std::path::Path;
use tracing::{debug, info, info_span, warn};

const OP: &str = "Excel conversion";

impl PdfToolkit {
    /// Extract every table in a PDF into one XLSX sheet.
    ///
    /// Pages are visited in batches of `batch_size` (default: the configured
    /// batch size). Batching only paces the work; the output is the same for
    /// any batch size. Fails with [`ToolkitError::NoTablesFound`] when no page
    /// yields a table.
    pub fn to_excel<'a>(
        &self,
        source: impl Into<PdfSource<'a>>,
        dest: Option<&Path>,
        batch_size: Option<usize>,
    ) -> Result<OperationOutput, ToolkitError> {
        let span = info_span!("operation", op = %Operation::ToExcel);
        let _enter = span.enter();

        let pdf = self.load(source.into(), OP)?;
        pdf.require_plain()?;

        let total = pdf.page_count();
        let batch = batch_size.unwrap_or(self.config().batch_size).max(1);
        info!("Processing PDF with {} pages", total);
        self.progress().on_operation_start(Operation::ToExcel, total);

        let mut tables = Vec::new();
        for first in (0..total).step_by(batch) {
            let end = (first + batch).min(total);
            info!("Processing pages {} to {}", first + 1, end);
            self.progress().on_batch_start(first + 1, end, total);

            for page in first..end {
                let found = shield(OP, || self.table_extractor().extract_tables(&pdf, page))?;
                debug!("Page {}: {} tables", page + 1, found.len());
                tables.extend(
                    found
                        .into_iter()
                        .filter(|rows| !rows.is_empty())
                        .map(ExtractedTable::from_rows),
                );
                self.progress().on_page_complete(page + 1, total);
            }
        }

        if tables.is_empty() {
            let err = ToolkitError::NoTablesFound;
            warn!("{}", err);
            return Err(err);
        }

        let combined = CombinedTable::concat(&tables);
        info!(
            "Combined {} tables into {} rows x {} columns",
            tables.len(),
            combined.rows.len(),
            combined.columns.len()
        );
        let bytes = shield(OP, || self.spreadsheet_writer().write(&combined))?;

        self.finish(Operation::ToExcel, "Excel file", bytes, dest)
    }
}
