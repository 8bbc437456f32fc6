use crate::config::PageRange;
use crate::engine::LoadedPdf;
use crate::error::ToolkitError;
use crate::output::OperationOutput;
use crate::pipeline::input::PdfSource;
use crate::progress::Operation;
use crate::toolkit::{shield, PdfToolkit};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, info_span, warn};

const OP: &str = "Word conversion";

impl PdfToolkit {
    /// Convert a page range of a PDF to DOCX.
    ///
    /// The word converter works on files, so the source is first written to
    /// a temporary PDF and converted into a temporary DOCX. Both are removed
    /// on every exit path; a failed removal is logged and otherwise ignored.
    pub fn to_word<'a>(
        &self,
        source: impl Into<PdfSource<'a>>,
        dest: Option<&Path>,
        pages: PageRange,
    ) -> Result<OperationOutput, ToolkitError> {
        let span = info_span!("operation", op = %Operation::ToWord);
        let _enter = span.enter();

        let bytes = self.read(source.into())?;
        let (first, last) = {
            let pdf = shield(OP, || LoadedPdf::parse(&bytes, OP))?;
            pdf.require_plain()?;
            pages.resolve(pdf.page_count())?
        };
        info!(
            "Converting PDF to Word (pages {} to {})",
            pages.start,
            pages.end.map_or_else(|| "end".to_string(), |e| e.to_string())
        );
        self.progress()
            .on_operation_start(Operation::ToWord, last - first + 1);

        let temp_pdf = TempFile::create("PDF", ".pdf", &bytes)?;
        let temp_docx = TempFile::create("Word", ".docx", &[])?;

        shield(OP, || {
            self.word_converter().convert(
                temp_pdf.path(),
                temp_docx.path(),
                first,
                last,
                self.progress(),
            )
        })?;

        let docx = std::fs::read(temp_docx.path())
            .map_err(|e| ToolkitError::engine(OP, format!("cannot read converted document: {e}")))?;
        if docx.is_empty() {
            return Err(ToolkitError::engine(OP, "converter produced an empty document"));
        }

        self.finish(Operation::ToWord, "Word file", docx, dest)
    }
}

/// A temporary file deleted when dropped.
struct TempFile {
    temp: Option<TempPath>,
    location: PathBuf,
    label: &'static str,
}

impl TempFile {
    fn create(label: &'static str, suffix: &str, contents: &[u8]) -> Result<Self, ToolkitError> {
        let mut file = tempfile::Builder::new()
            .prefix(".pdf-toolkit-")
            .suffix(suffix)
            .tempfile()
            .map_err(|e| ToolkitError::Internal(format!("cannot create temporary {label} file: {e}")))?;
        file.write_all(contents)
            .and_then(|_| file.flush())
            .map_err(|e| ToolkitError::Internal(format!("cannot write temporary {label} file: {e}")))?;

        let temp = file.into_temp_path();
        let location = temp.to_path_buf();
        debug!("Created temporary {} file: {}", label, location.display());
        Ok(Self {
            temp: Some(temp),
            location,
            label,
        })
    }

    fn path(&self) -> &Path {
        &self.location
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };
        match temp.close() {
            Ok(()) => debug!(
                "Deleted temporary {} file: {}",
                self.label,
                self.location.display()
            ),
            Err(e) => warn!(
                "Failed to delete temporary {} file {}: {}",
                self.label,
                self.location.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_holds_contents_until_dropped() {
        let temp = TempFile::create("PDF", ".pdf", b"%PDF-1.7").unwrap();
        let path = temp.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert_eq!(path.extension().unwrap(), "pdf");
        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn already_removed_temp_file_does_not_panic() {
        let temp = TempFile::create("Word", ".docx", &[]).unwrap();
        std::fs::remove_file(temp.path()).unwrap();
        drop(temp);
    }
}
