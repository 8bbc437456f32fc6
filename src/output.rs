//! Operation results and destination writes.
//!
//! Every operation ends the same way: the produced bytes either go to the
//! caller-supplied destination path, or come back in memory. Never both.
//!
//! Destination writes are atomic: bytes land in a temp file next to the
//! destination and are renamed over it only once fully written. A failure
//! half-way through therefore never leaves a truncated PDF/DOCX/XLSX behind.

use crate::error::ToolkitError;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Successful result of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OperationOutput {
    /// Output was written to this path.
    Written(PathBuf),
    /// Output returned in memory (no destination given).
    Bytes(#[serde(serialize_with = "serialize_len")] Vec<u8>),
}

#[allow(clippy::ptr_arg)]
fn serialize_len<S: serde::Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(bytes.len() as u64)
}

impl OperationOutput {
    /// Destination path, if the output was written to disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OperationOutput::Written(p) => Some(p),
            OperationOutput::Bytes(_) => None,
        }
    }

    /// In-memory bytes, if no destination was given.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            OperationOutput::Written(_) => None,
            OperationOutput::Bytes(b) => Some(b),
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            OperationOutput::Written(_) => None,
            OperationOutput::Bytes(b) => Some(b),
        }
    }
}

/// Deliver `bytes` to `dest`, or hand them back when there is none.
pub fn deliver(bytes: Vec<u8>, dest: Option<&Path>) -> Result<OperationOutput, ToolkitError> {
    match dest {
        Some(path) => {
            write_atomic(path, &bytes)?;
            Ok(OperationOutput::Written(path.to_path_buf()))
        }
        None => Ok(OperationOutput::Bytes(bytes)),
    }
}

/// Atomic write: temp file in the destination directory, then rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ToolkitError> {
    let fail = |source: std::io::Error| ToolkitError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".pdf-toolkit-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
