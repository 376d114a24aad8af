//! Progress-callback trait for per-page dispatch events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to follow a run as
//! it walks the document: which page is being read, who it was sent to,
//! which pages nobody claimed.
//!
//! # Example
//!
//! ```rust
//! use payslip_mailer::{RunConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     sent: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_page_sent(&self, page_num: usize, total_pages: usize, employee: &str) {
//!         self.sent.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} sent to {}", page_num, total_pages, employee);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { sent: AtomicUsize::new(0) });
//!
//! let config = RunConfig::builder()
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the dispatcher as it processes each page.
///
/// The run executes on a blocking worker thread, so implementations must be
/// `Send + Sync`. Pages are handled strictly in order and events for one
/// page never interleave with another's. Every method defaults to a no-op.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after the document is opened.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's text is matched.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after the page was delivered to its owner.
    fn on_page_sent(&self, page_num: usize, total_pages: usize, employee: &str) {
        let _ = (page_num, total_pages, employee);
    }

    /// Called when no selected employee was found on the page.
    ///
    /// `preview` is what the matcher read, already normalized.
    fn on_page_unattributed(&self, page_num: usize, total_pages: usize, preview: &str) {
        let _ = (page_num, total_pages, preview);
    }

    /// Called when the page had an owner but could not be split or sent.
    fn on_delivery_error(&self, page_num: usize, total_pages: usize, employee: &str, error: &str) {
        let _ = (page_num, total_pages, employee, error);
    }

    /// Called once after every page has been handled.
    ///
    /// # Arguments
    /// * `total_pages`: pages in the document
    /// * `sent_count`: messages delivered
    fn on_run_complete(&self, total_pages: usize, sent_count: usize) {
        let _ = (total_pages, sent_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
