//! Page text extraction and single-page split via pdfium.
//!
//! The dispatcher only sees the [`PayslipDocument`] trait: page count, raw
//! page text, and a page cut out as a standalone PDF. [`PdfiumDocument`] is
//! the production implementation; tests drive the dispatcher with in-memory
//! fakes.
//!
//! pdfium is not async-safe, so everything here is blocking and is called
//! from inside `spawn_blocking` (see [`crate::dispatch`]).

use crate::error::{DocumentError, SplitError};
use crate::pipeline::input::Upload;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An ordered sequence of pages that can be read and split.
pub trait PayslipDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Raw text of the 0-indexed page.
    ///
    /// `None` when nothing could be extracted (image-only page, or the
    /// text layer failed to load).
    fn page_text(&self, index: usize) -> Option<String>;

    /// The 0-indexed page as a standalone single-page document.
    fn extract_single_page(&self, index: usize) -> Result<Vec<u8>, SplitError>;
}

/// A PDF opened through pdfium.
pub struct PdfiumDocument<'a> {
    pdfium: &'a Pdfium,
    document: PdfDocument<'a>,
    path: PathBuf,
}

impl<'a> PdfiumDocument<'a> {
    /// Parse an upload. Failure here aborts the whole run.
    pub fn open(
        pdfium: &'a Pdfium,
        upload: Upload,
        password: Option<&str>,
    ) -> Result<Self, DocumentError> {
        let Upload { path, bytes } = upload;
        let document = pdfium
            .load_pdf_from_byte_vec(bytes, password)
            .map_err(|e| map_load_error(&path, password.is_some(), e))?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Self {
            pdfium,
            document,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PayslipDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Option<String> {
        let page = match self.document.pages().get(index as PdfPageIndex) {
            Ok(page) => page,
            Err(e) => {
                warn!("Page {}: could not be loaded: {:?}", index + 1, e);
                return None;
            }
        };
        let text = match page.text() {
            Ok(text) => Some(text.all()),
            Err(e) => {
                warn!("Page {}: text extraction failed: {:?}", index + 1, e);
                None
            }
        };
        text
    }

    fn extract_single_page(&self, index: usize) -> Result<Vec<u8>, SplitError> {
        let total = self.page_count();
        if index >= total {
            return Err(SplitError::PageOutOfRange {
                page: index + 1,
                total,
            });
        }
        let failed = |e: PdfiumError| SplitError::Failed {
            page: index + 1,
            detail: format!("{:?}", e),
        };

        let mut single = self.pdfium.create_new_pdf().map_err(failed)?;
        single
            .pages_mut()
            .copy_page_from_document(&self.document, index as PdfPageIndex, 0)
            .map_err(failed)?;
        single.save_to_bytes().map_err(failed)
    }
}

fn map_load_error(path: &Path, had_password: bool, e: PdfiumError) -> DocumentError {
    match e {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if had_password {
                DocumentError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                DocumentError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        }
        other => DocumentError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", other),
        },
    }
}
