//! Run orchestration: read pages, attribute, split, send, report.
//!
//! A run walks the document strictly in page order:
//!
//! ```text
//! Idle ─▶ Reading(page i of N) ─▶ Matching ─▶ Splitting ─▶ Sending ─┐
//!              ▲                      │ (no owner)                    │
//!              └──────────────────────┴───────────────────────────────┘
//!                                   after page N ─▶ Reporting ─▶ Idle
//! ```
//!
//! Only a document that cannot be opened aborts the run. Split and send
//! failures are recorded in the report and the next page is processed.
//!
//! [`run`] is the blocking core and works on any [`PayslipDocument`] and
//! [`Mailer`]. [`dispatch`] is the async entry point for a PDF on disk: it
//! moves the pdfium and SMTP work onto `spawn_blocking`.

use crate::attribution::{attribute_with_preview, Attribution};
use crate::config::RunConfig;
use crate::directory::{CandidateSet, EmployeeDirectory};
use crate::error::DocumentError;
use crate::normalize::normalize;
use crate::pipeline::document::{PayslipDocument, PdfiumDocument};
use crate::pipeline::mail::{attachment_filename, Mailer, OutgoingMessage};
use crate::pipeline::{engine, input};
use crate::report::RunReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Dispatch every payslip in the PDF at `input_path`.
///
/// # Returns
/// `Ok(RunReport)` once every page was handled, even if some deliveries
/// failed (see [`RunReport::send_errors`]).
///
/// # Errors
/// Returns `Err(DocumentError)` only when the run cannot start:
/// - nobody selected, or a selected name missing from the directory
/// - file not found / permission denied / not a PDF
/// - corrupt or encrypted PDF, pdfium unavailable
pub async fn dispatch(
    input_path: impl AsRef<Path>,
    directory: &EmployeeDirectory,
    candidates: &CandidateSet,
    mailer: Arc<dyn Mailer>,
    config: &RunConfig,
) -> Result<RunReport, DocumentError> {
    validate_candidates(directory, candidates)?;

    let path = input_path.as_ref().to_path_buf();
    let directory = directory.clone();
    let candidates = candidates.clone();
    let config = config.clone();

    tokio::task::spawn_blocking(move || -> Result<RunReport, DocumentError> {
        let upload = input::read_upload(&path)?;
        let pdfium = engine::bind_pdfium()?;
        let document = PdfiumDocument::open(&pdfium, upload, config.password.as_deref())?;
        Ok(run(
            &document,
            &directory,
            &candidates,
            mailer.as_ref(),
            &config,
        ))
    })
    .await
    .map_err(|e| DocumentError::Internal(format!("Dispatch task panicked: {}", e)))?
}

/// Synchronous wrapper around [`dispatch`].
///
/// Creates a temporary tokio runtime internally.
pub fn dispatch_sync(
    input_path: impl AsRef<Path>,
    directory: &EmployeeDirectory,
    candidates: &CandidateSet,
    mailer: Arc<dyn Mailer>,
    config: &RunConfig,
) -> Result<RunReport, DocumentError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocumentError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(dispatch(input_path, directory, candidates, mailer, config))
}

/// Normalized text of one page, as the matcher sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    pub text: String,
}

/// Read every page's normalized text without sending anything.
///
/// Lets an operator copy names exactly as they will be matched. Needs no
/// mail configuration.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<Vec<PageText>, DocumentError> {
    let path: PathBuf = input_path.as_ref().to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || -> Result<Vec<PageText>, DocumentError> {
        let upload = input::read_upload(&path)?;
        let pdfium = engine::bind_pdfium()?;
        let document = PdfiumDocument::open(&pdfium, upload, password.as_deref())?;
        Ok(page_texts(&document))
    })
    .await
    .map_err(|e| DocumentError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Normalized text of every page of an open document.
pub fn page_texts<D: PayslipDocument + ?Sized>(document: &D) -> Vec<PageText> {
    (0..document.page_count())
        .map(|idx| PageText {
            page_num: idx + 1,
            text: normalize(document.page_text(idx).as_deref()),
        })
        .collect()
}

/// Reject runs that could never attribute a page.
pub fn validate_candidates(
    directory: &EmployeeDirectory,
    candidates: &CandidateSet,
) -> Result<(), DocumentError> {
    if candidates.is_empty() {
        return Err(DocumentError::NoCandidates);
    }
    if let Some(name) = candidates.names().iter().find(|n| !directory.contains(n)) {
        return Err(DocumentError::UnknownEmployee { name: name.clone() });
    }
    Ok(())
}

/// Process every page of an open document. Blocking.
///
/// Pages are handled one at a time in order; each send blocks until the
/// mailer answers. The directory and candidates are only read.
pub fn run<D, M>(
    document: &D,
    directory: &EmployeeDirectory,
    candidates: &CandidateSet,
    mailer: &M,
    config: &RunConfig,
) -> RunReport
where
    D: PayslipDocument + ?Sized,
    M: Mailer + ?Sized,
{
    let start = Instant::now();
    let total_pages = document.page_count();
    let mut report = RunReport::new();
    info!(
        "Starting run: {} pages, {} candidates",
        total_pages,
        candidates.len()
    );

    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_run_start(total_pages);
    }

    for idx in 0..total_pages {
        let page_num = idx + 1;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total_pages);
        }

        let text = document.page_text(idx);
        let owner = match attribute_with_preview(
            text.as_deref(),
            candidates.names(),
            config.preview_chars,
        ) {
            Attribution::Owner(name) => name,
            Attribution::Unattributed(preview) => {
                debug!("Page {}: no owner", page_num);
                if let Some(cb) = cb {
                    cb.on_page_unattributed(page_num, total_pages, &preview.to_string());
                }
                report.record_unattributed(page_num, preview);
                continue;
            }
        };
        debug!("Page {}: found {}", page_num, owner);

        match deliver(document, directory, mailer, config, idx, &owner) {
            Ok(()) => {
                info!("Page {}: sent to {}", page_num, owner);
                if let Some(cb) = cb {
                    cb.on_page_sent(page_num, total_pages, &owner);
                }
                report.record_sent(&owner);
            }
            Err(error) => {
                warn!("Page {}: delivery to {} failed: {}", page_num, owner, error);
                if let Some(cb) = cb {
                    cb.on_delivery_error(page_num, total_pages, &owner, &error);
                }
                report.record_send_error(&owner, error);
            }
        }
    }

    info!(
        "Run complete: {} sent, {} unattributed, {} errors, {}ms",
        report.sent_count(),
        report.unattributed_pages().len(),
        report.send_errors().len(),
        start.elapsed().as_millis()
    );
    if let Some(cb) = cb {
        cb.on_run_complete(total_pages, report.sent_count());
    }

    report
}

/// Split one page and send it to its owner.
///
/// The error string is what ends up in the report.
fn deliver<D, M>(
    document: &D,
    directory: &EmployeeDirectory,
    mailer: &M,
    config: &RunConfig,
    idx: usize,
    owner: &str,
) -> Result<(), String>
where
    D: PayslipDocument + ?Sized,
    M: Mailer + ?Sized,
{
    let to = directory
        .address_of(owner)
        .ok_or_else(|| format!("no address on file for '{owner}'"))?;

    let attachment = document
        .extract_single_page(idx)
        .map_err(|e| e.to_string())?;

    let message = OutgoingMessage {
        to: to.to_string(),
        bcc: config.bcc.clone(),
        subject: config.subject.clone(),
        body: config.body.clone(),
        attachment_filename: attachment_filename(owner),
        attachment,
    };

    mailer
        .send(&message)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
