use crate::config::EncryptionAlgorithm;
use crate::engine::crypto::{decrypt_document, encrypt_document};
use crate::engine::{save, LoadedPdf};
use crate::error::ToolkitError;
use crate::output::OperationOutput;
use crate::pipeline::input::PdfSource;
use crate::progress::Operation;
use crate::toolkit::{shield, PdfToolkit};
use std::path::Path;
use tracing::{debug, error, info_span, warn};

const ENCRYPT: &str = "encryption";
const DECRYPT: &str = "decryption";

impl PdfToolkit {
    /// Password-protect a PDF.
    ///
    /// The password serves as both user and owner password; every
    /// permission is granted. `algorithm` defaults to the configured one
    /// (AES-256-R5 unless changed).
    pub fn encrypt<'a>(
        &self,
        source: impl Into<PdfSource<'a>>,
        dest: Option<&Path>,
        password: &str,
        algorithm: Option<EncryptionAlgorithm>,
    ) -> Result<OperationOutput, ToolkitError> {
        let span = info_span!("operation", op = %Operation::Encrypt);
        let _enter = span.enter();

        let bytes = self.read(source.into())?;
        require_password(password, ENCRYPT)?;

        let pdf = shield(ENCRYPT, || LoadedPdf::parse(&bytes, ENCRYPT))?;
        if pdf.is_encrypted() {
            return Err(ToolkitError::AlreadyEncrypted);
        }
        let algorithm = algorithm.unwrap_or(self.config().default_algorithm);
        debug!("Using algorithm {}", algorithm);
        self.progress()
            .on_operation_start(Operation::Encrypt, pdf.page_count());

        let mut doc = pdf.into_document();
        let out = shield(ENCRYPT, || {
            encrypt_document(&mut doc, password, algorithm)?;
            save(&mut doc, ENCRYPT)
        })?;

        self.finish(Operation::Encrypt, "Encrypted PDF", out, dest)
    }

    /// Remove password protection from a PDF.
    ///
    /// Fails with [`ToolkitError::NotEncrypted`] for a plain document and
    /// [`ToolkitError::WrongPassword`] when the password does not open it or
    /// the opened document has no pages.
    pub fn decrypt<'a>(
        &self,
        source: impl Into<PdfSource<'a>>,
        dest: Option<&Path>,
        password: &str,
    ) -> Result<OperationOutput, ToolkitError> {
        let span = info_span!("operation", op = %Operation::Decrypt);
        let _enter = span.enter();

        let bytes = self.read(source.into())?;
        require_password(password, DECRYPT)?;

        let encrypted = shield(DECRYPT, || LoadedPdf::parse(&bytes, DECRYPT))?.is_encrypted();
        if !encrypted {
            let err = ToolkitError::NotEncrypted;
            warn!("{}", err);
            return Err(err);
        }
        // Page count stays unknown until the document is open.
        self.progress().on_operation_start(Operation::Decrypt, 0);

        let out = shield(DECRYPT, || {
            let mut plain = decrypt_document(&bytes, password).inspect_err(|e| {
                if matches!(e, ToolkitError::WrongPassword) {
                    error!("{}", e);
                }
            })?;
            save(&mut plain, DECRYPT)
        })?;

        self.finish(Operation::Decrypt, "Decrypted PDF", out, dest)
    }
}

fn require_password(password: &str, operation: &str) -> Result<(), ToolkitError> {
    if password.is_empty() {
        let err = ToolkitError::MissingArgument(format!("Password is required for {operation}"));
        error!("{}", err);
        return Err(err);
    }
    Ok(())
}
