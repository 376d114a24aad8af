//! Error types for the payslip-mailer library.
//!
//! Failures split along how far they reach:
//!
//! * [`DocumentError`] is **fatal** for a run. The uploaded file cannot be
//!   opened as a PDF, pdfium is unavailable, or the run was asked to match
//!   nobody. Returned as `Err(DocumentError)` from the `dispatch*` entry
//!   points and no report is produced.
//!
//! * [`ConfigError`]: the mail credentials or the employee directory could
//!   not be loaded. The CLI halts before anything is sent.
//!
//! * [`SplitError`] and [`SendError`] are **non-fatal**. One page could not be
//!   cut out of the document, or one message could not be delivered. They
//!   are recorded in [`crate::report::RunReport::send_errors`] and the run
//!   moves on to the next page.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a run before any report exists.
#[derive(Debug, Error)]
pub enum DocumentError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Reading the file failed after it was opened.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the executable or in the working directory,\n\
install it system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Selection errors ──────────────────────────────────────────────────
    /// The candidate set is empty; nobody could own a page.
    #[error("No employees selected for this run")]
    NoCandidates,

    /// A selected name does not exist in the employee directory.
    #[error("Employee '{name}' is not in the directory")]
    UnknownEmployee { name: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Invalid run configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors loading the mail configuration or the employee directory.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is absent or blank.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid email address for '{name}': {address}")]
    InvalidAddress { name: String, address: String },

    #[error("Employee name must not be empty")]
    EmptyName,

    /// The employee list has neither accepted layout.
    #[error("Malformed employee list: {0}")]
    InvalidEmployees(String),
}

/// A single page could not be extracted into its own document.
#[derive(Debug, Clone, Error)]
pub enum SplitError {
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("Page {page}: split failed: {detail}")]
    Failed { page: usize, detail: String },
}

/// A message could not be delivered. Never retried.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// Sender, recipient or BCC address does not parse.
    #[error("invalid address '{address}': {detail}")]
    InvalidAddress { address: String, detail: String },

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The SMTP server refused the message or the connection failed.
    #[error("{0}")]
    Transport(String),

    /// Dry-run output could not be written.
    #[error("failed to write '{path}': {detail}")]
    Write { path: PathBuf, detail: String },
}
