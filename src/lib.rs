//! # payslip-mailer
//!
//! Split a multi-employee payroll-slip PDF into single pages and email each
//! page to the employee named on it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      read the upload, check the %PDF magic
//!  ├─ 2. Text       extract each page's text via pdfium (spawn_blocking)
//!  ├─ 3. Attribute  first selected employee whose normalized name occurs
//!  │                in the normalized page text owns the page
//!  ├─ 4. Split      copy the page into a standalone one-page PDF
//!  ├─ 5. Send       SMTP message with Holerite_<name>.pdf attached (+ BCC)
//!  └─ 6. Report     sent count, employees not found, unattributed pages,
//!                   delivery errors
//! ```
//!
//! Only a document that cannot be opened stops a run. Split and send
//! failures are collected in the [`RunReport`] and the next page proceeds.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payslip_mailer::{dispatch, RunConfig, Settings, SmtpMailer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_file("payslip.toml")?;
//!     let mail = settings.require_mail()?;
//!     let mailer = Arc::new(SmtpMailer::new(mail)?);
//!
//!     let directory = settings.employees.clone();
//!     let candidates = directory.select_all();
//!     let mut builder = RunConfig::builder();
//!     if let Some(ref bcc) = mail.bcc {
//!         builder = builder.bcc(bcc.clone());
//!     }
//!     let config = builder.build()?;
//!
//!     let report = dispatch("folha.pdf", &directory, &candidates, mailer, &config).await?;
//!     println!("{}", report.summary(&candidates));
//!     Ok(())
//! }
//! ```
//!
//! ## Matching rules
//!
//! Page text and names are normalized (whitespace collapsed, trimmed,
//! upper-cased) and compared by substring. Accents are not folded, and the
//! order of the selected employees decides which of two overlapping names
//! ("ANA" vs "ANA SILVA") wins a page.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod attribution;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use attribution::{attribute, Attribution, PagePreview};
pub use config::{MailConfig, RunConfig, RunConfigBuilder, Settings, SmtpEndpoint, SmtpSecurity};
pub use directory::{CandidateSet, Employee, EmployeeDirectory};
pub use dispatch::{dispatch, dispatch_sync, inspect, run, PageText};
pub use error::{ConfigError, DocumentError, SendError, SplitError};
pub use normalize::normalize;
pub use pipeline::document::{PayslipDocument, PdfiumDocument};
pub use pipeline::mail::{DryRunMailer, Mailer, OutgoingMessage, Sent, SmtpMailer};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use report::{RunReport, RunSummary, SendFailure, UnattributedPage};
