//! Collaborators the dispatcher drives for each run.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ engine ──▶ document ──▶ (attribution) ──▶ mail
//! (path)    (pdfium)   (text, split)                  (SMTP)
//! ```
//!
//! 1. [`input`] reads the uploaded file and checks it is a PDF
//! 2. [`engine`] binds to the pdfium shared library
//! 3. [`document`] gives page text and single-page split; blocking, pdfium is
//!    not async-safe
//! 4. [`mail`] delivers one message with one attachment; the only stage
//!    with network I/O

pub mod document;
pub mod engine;
pub mod input;
pub mod mail;
