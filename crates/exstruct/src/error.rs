//! Error types for exstruct

use std::path::PathBuf;

use exstruct_xlsx::{SheetUnreadable, XlsxError};
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the extraction pipeline.
///
/// Automation problems never appear here; they are reported as a
/// [`crate::Fallback`] on the extraction result instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The file backend could not open the workbook.
    #[error("Cannot open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    /// The file extension is not one the file backend reads.
    #[error("Unsupported file format: {0} (expected .xlsx or .xlsm)")]
    UnsupportedFormat(String),

    /// A mode string that is not `light`, `standard` or `verbose`.
    #[error("Invalid extraction mode: {0}")]
    InvalidMode(String),
}

/// Result type alias using [`BackendError`]
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failure of a single backend operation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A sheet's part of the workbook package could not be read.
    #[error("Sheet cannot be read from file: {0}")]
    FileUnreadable(#[from] SheetUnreadable),

    /// No automation session could be established.
    #[error("Automation unavailable: {0}")]
    AutomationUnavailable(String),

    /// A call on a live automation session failed.
    #[error("Automation call {operation} failed: {message}")]
    AutomationCall {
        operation: &'static str,
        message: String,
    },

    /// The backend has no sheet with this name.
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),
}
