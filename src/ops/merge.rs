use crate::engine::{merge::merge_documents, save};
use crate::error::ToolkitError;
use crate::output::OperationOutput;
use crate::pipeline::input::PdfSource;
use crate::pipeline::validate::validate;
use crate::progress::Operation;
use crate::toolkit::{shield, PdfToolkit};
use std::path::Path;
use tracing::{error, info, info_span};

const OP: &str = "merge";

impl PdfToolkit {
    /// Concatenate two or more PDFs, pages in input order.
    ///
    /// Every input is validated before any is parsed. The first failing
    /// input is reported as [`ToolkitError::InvalidInput`] with its 1-based
    /// position and nothing is written.
    pub fn merge<'a>(
        &self,
        sources: Vec<PdfSource<'a>>,
        dest: Option<&Path>,
    ) -> Result<OperationOutput, ToolkitError> {
        let span = info_span!("operation", op = %Operation::Merge);
        let _enter = span.enter();

        if sources.len() < 2 {
            let err = ToolkitError::TooFewInputs {
                given: sources.len(),
            };
            error!("{}", err);
            return Err(err);
        }

        let mut sources = sources;
        for (i, source) in sources.iter_mut().enumerate() {
            validate(source, self.config()).map_err(|e| {
                let err = ToolkitError::InvalidInput {
                    index: i + 1,
                    source: Box::new(e),
                };
                error!("{}", err);
                err
            })?;
        }

        let mut documents = Vec::with_capacity(sources.len());
        for (i, source) in sources.into_iter().enumerate() {
            info!("Adding PDF #{} from {}", i + 1, source.kind());
            let pdf = self.load(source, OP)?;
            if pdf.is_encrypted() {
                return Err(ToolkitError::InvalidInput {
                    index: i + 1,
                    source: Box::new(ToolkitError::Encrypted),
                });
            }
            documents.push(pdf.into_document());
        }

        let total_pages = documents.iter().map(|d| d.get_pages().len()).sum();
        self.progress()
            .on_operation_start(Operation::Merge, total_pages);

        let bytes = shield(OP, || {
            let mut merged = merge_documents(documents)?;
            save(&mut merged, OP)
        })?;

        self.finish(Operation::Merge, "Merged PDF", bytes, dest)
    }
}
