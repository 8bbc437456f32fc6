//! Text-layout DOCX converter.
//!
//! Each page becomes one paragraph per text line, top to bottom. Cells of a
//! line (runs separated by a wide gap) are joined with tab stops so columns
//! survive the conversion. Pages are separated by hard page breaks.
//!
//! Only text is carried over. Images, vector graphics and font styling are
//! not reproduced.

use crate::config::TableDetection;
use crate::engine::ooxml::{escape, Package, XML_DECLARATION};
use crate::engine::text;
use crate::engine::{LoadedPdf, WordConverter};
use crate::error::ToolkitError;
use crate::output::write_atomic;
use crate::progress::OperationProgress;
use std::path::Path;
use tracing::debug;

const OP: &str = "Word conversion";

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// The built-in [`WordConverter`].
#[derive(Debug, Clone, Default)]
pub struct TextDocxConverter {
    layout: TableDetection,
}

impl TextDocxConverter {
    /// `layout` supplies the line tolerance and cell gap used to rebuild
    /// lines from positioned text.
    pub fn new(layout: TableDetection) -> Self {
        Self { layout }
    }

    /// Lines of one page, cells tab-separated.
    fn page_lines(&self, pdf: &LoadedPdf, index: usize) -> Result<Vec<String>, ToolkitError> {
        let page_id = pdf.page_id(index).ok_or(ToolkitError::PageOutOfRange {
            page: index,
            total: pdf.page_count(),
        })?;
        let runs = text::page_runs(pdf.document(), page_id)?;
        Ok(text::group_lines(runs, self.layout.row_tolerance)
            .iter()
            .map(|line| line.text(self.layout.cell_gap))
            .collect())
    }
}

impl WordConverter for TextDocxConverter {
    fn convert(
        &self,
        pdf_path: &Path,
        docx_path: &Path,
        first: usize,
        last: usize,
        progress: &dyn OperationProgress,
    ) -> Result<(), ToolkitError> {
        let pdf = LoadedPdf::open(pdf_path, OP)?;
        if first > last || last >= pdf.page_count() {
            return Err(ToolkitError::PageOutOfRange {
                page: last.max(first),
                total: pdf.page_count(),
            });
        }

        let total = last - first + 1;
        let mut body = String::new();
        for (done, index) in (first..=last).enumerate() {
            if done > 0 {
                body.push_str(PAGE_BREAK);
            }
            let lines = self.page_lines(&pdf, index)?;
            debug!("Page {}: {} lines", index + 1, lines.len());
            if lines.is_empty() {
                body.push_str("<w:p/>");
            }
            for line in &lines {
                push_paragraph(&mut body, line);
            }
            progress.on_page_complete(done + 1, total);
        }

        let mut pkg = Package::new(OP);
        pkg.add("[Content_Types].xml", &format!("{XML_DECLARATION}{CONTENT_TYPES}"))?;
        pkg.add("_rels/.rels", &format!("{XML_DECLARATION}{ROOT_RELS}"))?;
        pkg.add("word/document.xml", &document_xml(&body))?;
        write_atomic(docx_path, &pkg.finish()?)
    }
}

fn document_xml(body: &str) -> String {
    format!(
        r#"{XML_DECLARATION}<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

fn push_paragraph(body: &mut String, line: &str) {
    body.push_str("<w:p><w:r>");
    for (i, cell) in line.split('\t').enumerate() {
        if i > 0 {
            body.push_str("<w:tab/>");
        }
        body.push_str(r#"<w:t xml:space="preserve">"#);
        body.push_str(&escape(cell));
        body.push_str("</w:t>");
    }
    body.push_str("</w:r></w:p>");
}
