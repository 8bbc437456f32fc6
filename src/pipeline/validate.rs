//! Input validation: existence → size → content sniff.
//!
//! ## Why sniff instead of trusting the extension?
//!
//! Callers routinely hand us `report.pdf` files that are really HTML error
//! pages or zipped bundles. Reading the first `sniff_len` bytes and
//! classifying them is cheap, and it rejects the file before any delegate
//! engine gets a chance to choke on it. The extension is never consulted.
//!
//! Checks run in a fixed order and the first failure wins. Messages are not
//! aggregated.

use crate::config::ToolkitConfig;
use crate::error::ToolkitError;
use crate::pipeline::input::{CursorGuard, PdfSource};
use serde::Serialize;
use std::io::{self, Read, Seek};
use std::path::Path;
use tracing::debug;

/// MIME type a PDF must sniff as.
pub const PDF_MIME: &str = "application/pdf";

/// Outcome of validating one input.
///
/// The library itself works with `Result<(), ToolkitError>`; this is the
/// flattened view for callers that only want a yes/no and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<&Result<(), ToolkitError>> for ValidationOutcome {
    fn from(r: &Result<(), ToolkitError>) -> Self {
        match r {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Validate `source` without consuming it.
///
/// Stream sources are left at the cursor position they arrived with, on
/// success and on failure.
pub fn validate(source: &mut PdfSource<'_>, config: &ToolkitConfig) -> Result<(), ToolkitError> {
    match source {
        PdfSource::Path(path) => validate_path(path, config),
        PdfSource::Bytes(bytes) => validate_bytes(bytes, config),
        PdfSource::Stream(stream) => validate_stream(&mut **stream, config),
    }
}

/// [`validate`], flattened into a [`ValidationOutcome`].
pub fn check(source: &mut PdfSource<'_>, config: &ToolkitConfig) -> ValidationOutcome {
    ValidationOutcome::from(&validate(source, config))
}

fn validate_path(path: &Path, config: &ToolkitConfig) -> Result<(), ToolkitError> {
    let meta = std::fs::metadata(path).map_err(|e| path_error(path, e))?;
    if meta.is_dir() {
        return Err(ToolkitError::UnsupportedInput {
            detail: format!("'{}' is a directory", path.display()),
        });
    }
    check_size(meta.len(), config)?;

    let file = std::fs::File::open(path).map_err(|e| path_error(path, e))?;
    let head = read_head(file, config.sniff_len).map_err(|e| path_error(path, e))?;
    check_content(&head, "File")?;

    debug!("Validated PDF file {} ({} bytes)", path.display(), meta.len());
    Ok(())
}

fn validate_bytes(bytes: &[u8], config: &ToolkitConfig) -> Result<(), ToolkitError> {
    check_size(bytes.len() as u64, config)?;
    let head = &bytes[..bytes.len().min(config.sniff_len)];
    check_content(head, "Content")?;
    debug!("Validated PDF buffer ({} bytes)", bytes.len());
    Ok(())
}

fn validate_stream<S>(stream: &mut S, config: &ToolkitConfig) -> Result<(), ToolkitError>
where
    S: Read + Seek + ?Sized,
{
    let mut guard = CursorGuard::new(stream).map_err(stream_error)?;
    // Streams always have a measurable length here: we require Seek, so the
    // size ceiling is enforced, not skipped.
    let len = guard.measure().map_err(stream_error)?;
    check_size(len, config)?;

    guard.rewind().map_err(stream_error)?;
    let head = read_head(&mut guard, config.sniff_len).map_err(stream_error)?;
    check_content(&head, "File")?;

    debug!("Validated PDF stream ({} bytes)", len);
    Ok(())
}

fn check_size(size: u64, config: &ToolkitConfig) -> Result<(), ToolkitError> {
    if size > config.max_file_size {
        return Err(ToolkitError::SizeExceeded {
            size,
            limit: config.max_file_size,
        });
    }
    Ok(())
}

fn check_content(head: &[u8], subject: &'static str) -> Result<(), ToolkitError> {
    let detected = sniff_mime(head);
    if detected != PDF_MIME {
        return Err(ToolkitError::NotAPdf { subject, detected });
    }
    Ok(())
}

/// Read at most `limit` leading bytes.
pub(crate) fn read_head<R: Read>(reader: R, limit: usize) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(limit.min(4096));
    reader.take(limit as u64).read_to_end(&mut head)?;
    Ok(head)
}

pub(crate) fn path_error(path: &Path, e: io::Error) -> ToolkitError {
    match e.kind() {
        io::ErrorKind::NotFound => ToolkitError::FileNotFound {
            path: path.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied => ToolkitError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ToolkitError::UnsupportedInput {
            detail: format!("cannot read '{}': {e}", path.display()),
        },
    }
}

pub(crate) fn stream_error(e: io::Error) -> ToolkitError {
    ToolkitError::UnsupportedInput {
        detail: format!("stream is not readable and seekable: {e}"),
    }
}

// ── MIME sniffing ────────────────────────────────────────────────────────

/// Classify a buffer by its leading bytes.
///
/// Only the PDF rule matters for validation. The other classes exist so a
/// rejected input can be logged as what it actually is.
pub fn sniff_mime(head: &[u8]) -> &'static str {
    const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

    if head.is_empty() {
        return "application/x-empty";
    }
    // `%PDF-` at offset 0, or after a BOM or a single stray newline.
    let body = head.strip_prefix(UTF8_BOM).unwrap_or(head);
    let body = body
        .strip_prefix(b"\r\n")
        .or_else(|| body.strip_prefix(b"\n"))
        .unwrap_or(body);
    if body.starts_with(b"%PDF-") {
        return PDF_MIME;
    }

    match head {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'P', b'K', 0x03, 0x04, ..] => "application/zip",
        [b'{', b'\\', b'r', b't', b'f', ..] => "text/rtf",
        _ if looks_like_text(head) => "text/plain",
        _ => "application/octet-stream",
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    // A multi-byte char may be cut at the window edge.
    let text = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(e) if e.error_len().is_none() => {
            // Truncated tail only; the prefix is valid by construction.
            match std::str::from_utf8(&head[..e.valid_up_to()]) {
                Ok(s) => s,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };
    text.chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t' | '\x0C'))
}
