//! Run outcome accumulation and the end-of-run summary.
//!
//! A [`RunReport`] is filled page by page while the dispatcher walks the
//! document and is read-only once returned. It keeps everything: there is no
//! cap on how many unattributed pages or delivery errors are retained.
//!
//! An employee counts as *matched* as soon as a page was attributed to them,
//! whether or not the message went out. Both [`RunReport::record_sent`] and
//! [`RunReport::record_send_error`] add to the matched set, while
//! `sent_count` only counts successful deliveries. This keeps
//! `unmatched_employees` meaning "not found in the document".

use crate::attribution::PagePreview;
use crate::directory::CandidateSet;
use std::collections::BTreeSet;
use std::fmt;

/// A page nobody claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnattributedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub preview: PagePreview,
}

/// A page that had an owner but did not reach them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub employee: String,
    pub error: String,
}

/// Accumulated outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    sent_count: usize,
    matched: BTreeSet<String>,
    unattributed_pages: Vec<UnattributedPage>,
    send_errors: Vec<SendFailure>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page was delivered to `employee`.
    pub fn record_sent(&mut self, employee: &str) {
        self.sent_count += 1;
        self.matched.insert(employee.to_string());
    }

    /// No candidate owned page `page_num`.
    pub fn record_unattributed(&mut self, page_num: usize, preview: PagePreview) {
        self.unattributed_pages
            .push(UnattributedPage { page_num, preview });
    }

    /// A page owned by `employee` could not be split or sent.
    pub fn record_send_error(&mut self, employee: &str, error: impl Into<String>) {
        self.matched.insert(employee.to_string());
        self.send_errors.push(SendFailure {
            employee: employee.to_string(),
            error: error.into(),
        });
    }

    /// Final figures for the given candidate set.
    pub fn summary(&self, candidates: &CandidateSet) -> RunSummary {
        let unmatched_employees = candidates
            .names()
            .iter()
            .filter(|name| !self.matched.contains(name.as_str()))
            .cloned()
            .collect();

        RunSummary {
            sent_count: self.sent_count,
            matched_employees: self.matched.clone(),
            unmatched_employees,
            unattributed_pages: self.unattributed_pages.clone(),
            send_errors: self.send_errors.clone(),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    pub fn unattributed_pages(&self) -> &[UnattributedPage] {
        &self.unattributed_pages
    }

    pub fn send_errors(&self) -> &[SendFailure] {
        &self.send_errors
    }
}

/// Read-only view of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages delivered successfully.
    pub sent_count: usize,
    /// Candidates that owned at least one page.
    pub matched_employees: BTreeSet<String>,
    /// Candidates never found in the document.
    pub unmatched_employees: BTreeSet<String>,
    pub unattributed_pages: Vec<UnattributedPage>,
    pub send_errors: Vec<SendFailure>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.unmatched_employees.is_empty()
            && self.unattributed_pages.is_empty()
            && self.send_errors.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dispatch report")?;
        writeln!(f, "  {} payslip(s) sent", self.sent_count)?;

        if !self.unmatched_employees.is_empty() {
            writeln!(
                f,
                "\n  Employees not found in the file ({}):",
                self.unmatched_employees.len()
            )?;
            let names: Vec<&str> = self.unmatched_employees.iter().map(String::as_str).collect();
            writeln!(f, "    {}", names.join(", "))?;
            writeln!(
                f,
                "    Hint: the stored name must appear exactly as in the PDF text (see --inspect-only)."
            )?;
        }

        if !self.unattributed_pages.is_empty() {
            writeln!(
                f,
                "\n  Pages not sent, no owner identified ({}):",
                self.unattributed_pages.len()
            )?;
            for page in &self.unattributed_pages {
                writeln!(f, "    Page {}: read -> {}", page.page_num, page.preview)?;
            }
        }

        if !self.send_errors.is_empty() {
            writeln!(f, "\n  Delivery errors ({}):", self.send_errors.len())?;
            for failure in &self.send_errors {
                writeln!(f, "    {}: {}", failure.employee, failure.error)?;
            }
        }

        Ok(())
    }
}
