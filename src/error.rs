//! Error types for the csb-extract library.
//!
//! Failures are split by the pipeline stage that produced them:
//!
//! * [`RasterizeError`] — the source document could not be opened or a page
//!   could not be rendered / encoded.
//! * [`ExtractError`] — the vision model call failed, timed out, or returned
//!   something that does not fit the extraction schema.
//! * [`BatchError`] — wraps either of the above together with the document
//!   that caused it. Any document failure halts the whole batch.
//! * [`ExportError`] — the workbook could not be produced or written.
//!
//! Exporting an empty result set is *not* an error; it is reported as
//! [`crate::export::ExportOutcome::NoOp`].

use crate::record::ShippingBillRecord;
use std::path::PathBuf;
use thiserror::Error;

/// A source document could not be turned into page images.
#[derive(Debug, Error)]
pub enum RasterizeError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// The rendered bitmap could not be JPEG-encoded.
    #[error("Image encoding failed for page {page}: {source}")]
    Encode {
        page: usize,
        #[source]
        source: image::ImageError,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install pdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// The blocking render task panicked or was cancelled.
    #[error("Internal render error: {0}")]
    Internal(String),
}

/// One page image could not be turned into a [`crate::record::PartialRecord`].
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider returned an error.
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The call did not finish within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response is not JSON, not an object, or does not match the schema.
    #[error("Invalid JSON response from AI model: {reason}")]
    MalformedResponse { reason: String, raw: String },
}

/// Why a single document could not be finalised.
#[derive(Debug, Error)]
pub enum DocumentFailure {
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    #[error("page {page}: {source}")]
    Extract {
        page: usize,
        #[source]
        source: ExtractError,
    },
}

/// A batch halted on its first failing document.
///
/// `completed` holds the records finalised before the failure, in input
/// order. Nothing after `index` was attempted.
#[derive(Debug, Error)]
#[error("Failed to process '{document}' (document {position} of {total}): {failure}", position = .index + 1)]
pub struct BatchError {
    /// 0-based position of the failing document in the input.
    pub index: usize,
    /// Number of documents the batch was asked to process.
    pub total: usize,
    /// Name of the failing document.
    pub document: String,
    #[source]
    pub failure: DocumentFailure,
    pub completed: Vec<ShippingBillRecord>,
}

impl BatchError {
    /// Generic message suitable for end users; details go to the log.
    pub fn user_message(&self) -> String {
        format!(
            "An error occurred while processing {}. Please check the logs for details and try again. Stopping process.",
            self.document
        )
    }
}

/// The workbook could not be produced.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The spreadsheet backend rejected the data.
    #[error("Spreadsheet writer failed: {0}")]
    Writer(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid [`crate::config::ExtractionConfig`] or [`crate::config::ExportConfig`].
#[derive(Debug, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);
