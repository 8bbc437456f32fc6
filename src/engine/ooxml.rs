//! Shared Office Open XML packaging.
//!
//! DOCX and XLSX are both zip archives of XML parts plus a
//! `[Content_Types].xml` manifest and relationship parts. [`Package`]
//! collects the parts in memory and [`escape`] makes arbitrary extracted
//! text safe to embed as XML character data.

use crate::error::ToolkitError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Characters XML 1.0 does not allow anywhere in a document.
static RE_INVALID_XML: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\x09\x0A\x0D\x20-\x{D7FF}\x{E000}-\x{FFFD}\x{10000}-\x{10FFFF}]").unwrap()
});

/// An OOXML package being assembled in memory.
pub struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    operation: &'static str,
}

impl Package {
    /// `operation` names the conversion in error messages.
    pub fn new(operation: &'static str) -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            operation,
        }
    }

    /// Add one part. `name` is the part path inside the archive.
    pub fn add(&mut self, name: &str, content: &str) -> Result<(), ToolkitError> {
        self.zip
            .start_file(name, self.options)
            .map_err(|e| ToolkitError::engine(self.operation, format!("zip entry '{name}': {e}")))?;
        self.zip
            .write_all(content.as_bytes())
            .map_err(|e| ToolkitError::engine(self.operation, format!("zip write '{name}': {e}")))
    }

    pub fn finish(self) -> Result<Vec<u8>, ToolkitError> {
        let operation = self.operation;
        let cursor = self
            .zip
            .finish()
            .map_err(|e| ToolkitError::engine(operation, format!("zip finalise: {e}")))?;
        Ok(cursor.into_inner())
    }
}

/// Escape `text` for element content or attribute values, dropping
/// characters XML cannot represent.
pub fn escape(text: &str) -> Cow<'_, str> {
    let cleaned = RE_INVALID_XML.replace_all(text, "");
    if !cleaned.contains(['&', '<', '>', '"', '\'']) {
        return cleaned;
    }
    let mut out = String::with_capacity(cleaned.len() + 16);
    for c in cleaned.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape("it's"), "it&apos;s");
    }

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(escape("a\u{0}b\u{1F}c\td"), "abc\td");
    }

    #[test]
    fn package_round_trips_through_zip() {
        let mut pkg = Package::new("test");
        pkg.add("[Content_Types].xml", "<Types/>").unwrap();
        pkg.add("word/document.xml", "<doc/>").unwrap();
        let bytes = pkg.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut body = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "<doc/>");
    }
}
