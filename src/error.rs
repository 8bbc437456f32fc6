//! Error types for the pdf-toolkit library.
//!
//! Every operation returns `Result<OperationOutput, ToolkitError>`: the
//! success arm is a written path or an in-memory buffer, the failure arm is
//! a [`ToolkitError`] whose `Display` output is the human-readable message.
//!
//! Delegate failures (lopdf, image, zip, io) never escape raw. Each
//! operation converts them at its own boundary, usually into
//! [`ToolkitError::Engine`], so callers only ever branch on this one type.
//!
//! [`ErrorKind`] is the payload-free tag of a failure. It serialises to a
//! stable snake_case string for machine consumers (the CLI's `--json`
//! report uses it).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-toolkit library.
#[derive(Debug, Error)]
pub enum ToolkitError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// Path input does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Input exceeds the configured size ceiling.
    #[error("File size exceeds the maximum limit of {:.2} MB", mib(.limit))]
    SizeExceeded { size: u64, limit: u64 },

    /// Sniffed content type is not `application/pdf`.
    ///
    /// `subject` is "File" for path and stream inputs, "Content" for byte
    /// buffers.
    #[error("{subject} is not a valid PDF")]
    NotAPdf {
        subject: &'static str,
        detected: &'static str,
    },

    /// The source shape cannot be read as a PDF at all (a directory, an
    /// unreadable stream).
    #[error("Unsupported input type: {detail}")]
    UnsupportedInput { detail: String },

    // ── Argument errors ───────────────────────────────────────────────────
    /// A required argument was empty or absent (e.g. a password).
    #[error("{0}")]
    MissingArgument(String),

    /// Merge was called with fewer than two inputs.
    #[error("{}", too_few_message(.given))]
    TooFewInputs { given: usize },

    /// One input of a multi-input operation failed validation.
    ///
    /// `index` is 1-based, matching how users count their arguments.
    #[error("Validation failed for PDF #{index}: {source}")]
    InvalidInput {
        index: usize,
        #[source]
        source: Box<ToolkitError>,
    },

    /// Encryption algorithm name is not one of the supported ones.
    #[error("Unsupported encryption algorithm '{name}'\nSupported: RC4-40, RC4-128, AES-128, AES-256-R5, AES-256")]
    UnsupportedAlgorithm { name: String },

    /// Requested page lies beyond the end of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Encryption state errors ───────────────────────────────────────────
    /// Operation needs an unencrypted document.
    #[error("The PDF is encrypted; decrypt it first")]
    Encrypted,

    /// Encrypt was asked to encrypt an already encrypted document.
    #[error("The PDF is already encrypted")]
    AlreadyEncrypted,

    /// Decrypt was given a document without an encryption dictionary.
    #[error("The PDF is not encrypted")]
    NotEncrypted,

    /// Decryption failed: wrong password or a damaged security handler.
    #[error("Incorrect password or failed to decrypt the PDF")]
    WrongPassword,

    // ── Engine errors ─────────────────────────────────────────────────────
    /// A delegate engine failed (parse, rewrite, encode).
    #[error("An error occurred during {operation}: {detail}")]
    Engine {
        operation: &'static str,
        detail: String,
    },

    /// Table extraction ran over every page and found nothing.
    #[error("No tables found in the PDF")]
    NoTablesFound,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the destination file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or argument validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

fn too_few_message(given: &usize) -> &'static str {
    if *given == 0 {
        "No PDF files provided for merging"
    } else {
        "At least two PDF files are required for merging"
    }
}

impl ToolkitError {
    /// Shorthand for wrapping a delegate failure.
    pub fn engine(operation: &'static str, detail: impl fmt::Display) -> Self {
        ToolkitError::Engine {
            operation,
            detail: detail.to_string(),
        }
    }

    /// Payload-free classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolkitError::FileNotFound { .. } => ErrorKind::NotFound,
            ToolkitError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ToolkitError::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            ToolkitError::NotAPdf { .. } => ErrorKind::InvalidContentType,
            ToolkitError::UnsupportedInput { .. } => ErrorKind::UnsupportedInputType,
            ToolkitError::MissingArgument(_)
            | ToolkitError::TooFewInputs { .. }
            | ToolkitError::UnsupportedAlgorithm { .. }
            | ToolkitError::PageOutOfRange { .. }
            | ToolkitError::InvalidConfig(_) => ErrorKind::InvalidArgument,
            // A merge input failure is classified by its cause.
            ToolkitError::InvalidInput { source, .. } => source.kind(),
            ToolkitError::Encrypted
            | ToolkitError::AlreadyEncrypted
            | ToolkitError::NotEncrypted => ErrorKind::EncryptionState,
            ToolkitError::WrongPassword => ErrorKind::WrongPassword,
            ToolkitError::Engine { .. } | ToolkitError::Internal(_) => ErrorKind::EngineFailure,
            ToolkitError::NoTablesFound => ErrorKind::NoDataExtracted,
            ToolkitError::OutputWriteFailed { .. } => ErrorKind::WriteFailure,
        }
    }

    /// `true` for failures raised by input validation (existence, size,
    /// content sniffing) before any transformation began.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::PermissionDenied
                | ErrorKind::SizeExceeded
                | ErrorKind::InvalidContentType
                | ErrorKind::UnsupportedInputType
        )
    }
}

/// Tag of a [`ToolkitError`], stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    SizeExceeded,
    InvalidContentType,
    UnsupportedInputType,
    InvalidArgument,
    EncryptionState,
    WrongPassword,
    EngineFailure,
    NoDataExtracted,
    WriteFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::SizeExceeded => "size_exceeded",
            ErrorKind::InvalidContentType => "invalid_content_type",
            ErrorKind::UnsupportedInputType => "unsupported_input_type",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::EncryptionState => "encryption_state",
            ErrorKind::WrongPassword => "wrong_password",
            ErrorKind::EngineFailure => "engine_failure",
            ErrorKind::NoDataExtracted => "no_data_extracted",
            ErrorKind::WriteFailure => "write_failure",
        };
        f.write_str(s)
    }
}
