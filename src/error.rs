//! Error types for the render pipelines.
//!
//! Parsing and asset resolution are total and never produce these; only the
//! renderers and print engines do. A render that returns `Err` may already
//! have written bytes to its sink; callers must discard them.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing to the output sink failed.
    #[error("I/O error writing PDF: {0}")]
    Io(#[from] io::Error),

    /// The produced bytes are not a PDF.
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    /// The print engine could not be started.
    #[error("print engine '{engine}' failed to launch: {reason}")]
    Launch { engine: String, reason: String },

    /// The print engine could not load the generated HTML.
    #[error("print engine failed to load the document: {0}")]
    Navigation(String),

    /// The print engine failed while producing the PDF.
    #[error("print engine failed to print: {0}")]
    Print(String),

    /// The print engine session could not be shut down cleanly.
    #[error("print engine failed to shut down: {0}")]
    Teardown(String),
}

/// Guard the `%PDF` prefix every backend promises.
pub(crate) fn ensure_pdf(bytes: &[u8]) -> Result<()> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        let head = &bytes[..bytes.len().min(8)];
        Err(RenderError::Pdf(format!(
            "output does not start with %PDF (got {head:?})"
        )))
    }
}
