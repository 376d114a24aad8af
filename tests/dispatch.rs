//! Dispatcher integration tests against in-memory documents and mailers.
//!
//! Nothing here needs pdfium or a network: the document and the mailer are
//! fakes implementing the library's seams.

use payslip_mailer::{
    dispatch, inspect, run, CandidateSet, DocumentError, DryRunMailer, EmployeeDirectory, Mailer,
    OutgoingMessage, PagePreview, PayslipDocument, RunConfig, RunProgressCallback, SendError,
    Sent, SplitError,
};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Pages held in memory; `None` is a page without a text layer.
struct FakeDocument {
    pages: Vec<Option<String>>,
    unsplittable: Vec<usize>,
}

impl FakeDocument {
    fn new(pages: &[Option<&str>]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.map(str::to_string)).collect(),
            unsplittable: Vec::new(),
        }
    }

    /// Make the 1-indexed page fail to split.
    fn failing_split(mut self, page_num: usize) -> Self {
        self.unsplittable.push(page_num);
        self
    }
}

impl PayslipDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        self.pages[index].clone()
    }

    fn extract_single_page(&self, index: usize) -> Result<Vec<u8>, SplitError> {
        if self.unsplittable.contains(&(index + 1)) {
            return Err(SplitError::Failed {
                page: index + 1,
                detail: "page tree damaged".into(),
            });
        }
        Ok(format!("%PDF-1.7 page {}", index + 1).into_bytes())
    }
}

/// Records every message; addresses in `failures` get a transport error.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMessage>>,
    attempts: Mutex<Vec<String>>,
    failures: HashMap<String, String>,
}

impl RecordingMailer {
    fn failing(address: &str, error: &str) -> Self {
        Self {
            failures: HashMap::from([(address.to_string(), error.to_string())]),
            ..Self::default()
        }
    }

    fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }

    fn attempted(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<Sent, SendError> {
        self.attempts.lock().unwrap().push(message.to.clone());
        if let Some(error) = self.failures.get(&message.to) {
            return Err(SendError::Transport(error.clone()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(Sent {
            recipient: message.to.clone(),
        })
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl RunProgressCallback for EventLog {
    fn on_run_start(&self, total_pages: usize) {
        self.0.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_sent(&self, page_num: usize, _total: usize, employee: &str) {
        self.0.lock().unwrap().push(format!("sent {page_num} {employee}"));
    }
    fn on_page_unattributed(&self, page_num: usize, _total: usize, preview: &str) {
        self.0.lock().unwrap().push(format!("none {page_num} {preview}"));
    }
    fn on_delivery_error(&self, page_num: usize, _total: usize, employee: &str, error: &str) {
        self.0
            .lock()
            .unwrap()
            .push(format!("error {page_num} {employee}: {error}"));
    }
    fn on_run_complete(&self, total_pages: usize, sent_count: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("done {total_pages} {sent_count}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn company() -> EmployeeDirectory {
    EmployeeDirectory::from_entries([
        ("JOAO SILVA", "joao@example.com"),
        ("MARIA OLIVEIRA", "maria@example.com"),
        ("CARLOS", "carlos@example.com"),
    ])
    .unwrap()
}

fn three_pages() -> FakeDocument {
    FakeDocument::new(&[
        Some("Recibo de pagamento\nJoão\nJOAO  SILVA\nSalário 3.000,00"),
        None,
        Some("recibo de pagamento maria oliveira"),
    ])
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Run outcomes ─────────────────────────────────────────────────────────────

#[test]
fn every_owned_page_is_sent_and_the_rest_reported() {
    let dir = company();
    let candidates = dir.select_all();
    let mailer = RecordingMailer::default();

    let report = run(&three_pages(), &dir, &candidates, &mailer, &RunConfig::default());
    let summary = report.summary(&candidates);

    assert_eq!(summary.sent_count, 2);
    assert_eq!(summary.matched_employees, names(&["JOAO SILVA", "MARIA OLIVEIRA"]));
    assert_eq!(summary.unmatched_employees, names(&["CARLOS"]));
    assert_eq!(summary.unattributed_pages.len(), 1);
    assert_eq!(summary.unattributed_pages[0].page_num, 2);
    assert_eq!(summary.unattributed_pages[0].preview, PagePreview::NoText);
    assert!(summary.send_errors.is_empty());
    assert_eq!(
        mailer.recipients(),
        vec!["joao@example.com", "maria@example.com"]
    );
}

#[test]
fn failed_delivery_is_recorded_and_the_run_continues() {
    let dir = company();
    let candidates = dir.select_all();
    let mailer = RecordingMailer::failing("maria@example.com", "SMTP timeout");

    let report = run(&three_pages(), &dir, &candidates, &mailer, &RunConfig::default());
    let summary = report.summary(&candidates);

    assert_eq!(summary.sent_count, 1);
    assert_eq!(summary.send_errors.len(), 1);
    assert_eq!(summary.send_errors[0].employee, "MARIA OLIVEIRA");
    assert_eq!(summary.send_errors[0].error, "SMTP timeout");
    // Found in the document even though the message did not go out.
    assert!(summary.matched_employees.contains("MARIA OLIVEIRA"));
    assert!(!summary.unmatched_employees.contains("MARIA OLIVEIRA"));
}

#[test]
fn employee_absent_from_document_gets_no_message() {
    let dir = company()
        .add_employee("PEDRO SANTOS", "pedro@example.com")
        .unwrap();
    let candidates = dir.select(["PEDRO SANTOS", "JOAO SILVA"]).unwrap();
    let mailer = RecordingMailer::default();

    let report = run(&three_pages(), &dir, &candidates, &mailer, &RunConfig::default());
    let summary = report.summary(&candidates);

    assert!(!mailer.attempted().contains(&"pedro@example.com".to_string()));
    assert_eq!(summary.unmatched_employees, names(&["PEDRO SANTOS"]));
    // MARIA is not selected, so page 3 has no owner.
    assert_eq!(
        summary
            .unattributed_pages
            .iter()
            .map(|p| p.page_num)
            .collect::<Vec<_>>(),
        vec![2, 3]
    );
}

#[test]
fn first_selected_name_wins_overlapping_matches() {
    let dir = EmployeeDirectory::from_entries([
        ("ANA", "ana@example.com"),
        ("ANA SILVA", "ana.silva@example.com"),
    ])
    .unwrap();
    let doc = FakeDocument::new(&[Some("HOLERITE ANA SILVA")]);

    let short_first = RecordingMailer::default();
    run(
        &doc,
        &dir,
        &dir.select(["ANA", "ANA SILVA"]).unwrap(),
        &short_first,
        &RunConfig::default(),
    );
    assert_eq!(short_first.recipients(), vec!["ana@example.com"]);

    let long_first = RecordingMailer::default();
    run(
        &doc,
        &dir,
        &dir.select(["ANA SILVA", "ANA"]).unwrap(),
        &long_first,
        &RunConfig::default(),
    );
    assert_eq!(long_first.recipients(), vec!["ana.silva@example.com"]);
}

#[test]
fn split_failure_skips_only_that_page() {
    let dir = company();
    let candidates = dir.select_all();
    let mailer = RecordingMailer::default();
    let doc = three_pages().failing_split(1);

    let report = run(&doc, &dir, &candidates, &mailer, &RunConfig::default());

    assert_eq!(report.sent_count(), 1);
    assert_eq!(mailer.recipients(), vec!["maria@example.com"]);
    assert_eq!(report.send_errors().len(), 1);
    assert_eq!(report.send_errors()[0].employee, "JOAO SILVA");
    assert!(report.send_errors()[0].error.contains("page tree damaged"));
}

#[test]
fn unattributed_preview_is_truncated_normalized_text() {
    let dir = company();
    let candidates = dir.select_all();
    let long_page = format!("fatura {}", "x".repeat(200));
    let doc = FakeDocument::new(&[Some(&long_page)]);

    let report = run(
        &doc,
        &dir,
        &candidates,
        &RecordingMailer::default(),
        &RunConfig::default(),
    );

    match &report.unattributed_pages()[0].preview {
        PagePreview::Text { text, truncated } => {
            assert_eq!(text.chars().count(), 100);
            assert!(text.starts_with("FATURA X"));
            assert!(*truncated);
        }
        other => panic!("expected a text preview, got {other:?}"),
    }
}

#[test]
fn messages_carry_subject_body_bcc_and_named_attachment() {
    let dir = company();
    let config = RunConfig::builder()
        .subject("Holerite - Março/2024")
        .body("Olá,\nsegue o holerite.")
        .bcc("arquivo@example.com")
        .build()
        .unwrap();
    let mailer = RecordingMailer::default();

    run(&three_pages(), &dir, &dir.select_all(), &mailer, &config);

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    for message in sent.iter() {
        assert_eq!(message.subject, "Holerite - Março/2024");
        assert_eq!(message.body, "Olá,\nsegue o holerite.");
        assert_eq!(message.bcc.as_deref(), Some("arquivo@example.com"));
    }
    assert_eq!(sent[0].attachment_filename, "Holerite_JOAO SILVA.pdf");
    assert_eq!(sent[0].attachment, b"%PDF-1.7 page 1".to_vec());
    assert_eq!(sent[1].attachment_filename, "Holerite_MARIA OLIVEIRA.pdf");
}

#[test]
fn empty_document_yields_empty_report() {
    let dir = company();
    let candidates = dir.select_all();
    let report = run(
        &FakeDocument::new(&[]),
        &dir,
        &candidates,
        &RecordingMailer::default(),
        &RunConfig::default(),
    );
    let summary = report.summary(&candidates);

    assert_eq!(summary.sent_count, 0);
    assert_eq!(summary.unmatched_employees.len(), 3);
    assert!(summary.unattributed_pages.is_empty());
}

#[test]
fn summary_lists_problems_for_the_operator() {
    let dir = company();
    let candidates = dir.select_all();
    let mailer = RecordingMailer::failing("maria@example.com", "SMTP timeout");

    let report = run(&three_pages(), &dir, &candidates, &mailer, &RunConfig::default());
    let text = report.summary(&candidates).to_string();

    assert!(text.contains("1 payslip(s) sent"));
    assert!(text.contains("CARLOS"));
    assert!(text.contains("Page 2"));
    assert!(text.contains("MARIA OLIVEIRA"));
    assert!(text.contains("SMTP timeout"));
}

#[test]
fn dry_run_keeps_each_page_of_a_repeated_owner() {
    let dir = company();
    let candidates = dir.select_all();
    let out = tempfile::tempdir().unwrap();
    let doc = FakeDocument::new(&[
        Some("holerite joao silva janeiro"),
        Some("holerite joao silva 13o salario"),
    ]);

    let report = run(
        &doc,
        &dir,
        &candidates,
        &DryRunMailer::with_output_dir(out.path()),
        &RunConfig::default(),
    );

    assert_eq!(report.sent_count(), 2);
    assert_eq!(
        std::fs::read(out.path().join("Holerite_JOAO SILVA.pdf")).unwrap(),
        b"%PDF-1.7 page 1".to_vec()
    );
    assert_eq!(
        std::fs::read(out.path().join("Holerite_JOAO SILVA_2.pdf")).unwrap(),
        b"%PDF-1.7 page 2".to_vec()
    );
}

// ── Progress events ──────────────────────────────────────────────────────────

#[test]
fn progress_events_follow_page_order() {
    let dir = company();
    let log = Arc::new(EventLog::default());
    let config = RunConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let mailer = RecordingMailer::failing("maria@example.com", "SMTP timeout");

    run(&three_pages(), &dir, &dir.select_all(), &mailer, &config);

    let events = log.0.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 3".to_string(),
            "sent 1 JOAO SILVA".to_string(),
            "none 2 (empty page or image, no text extracted)".to_string(),
            "error 3 MARIA OLIVEIRA: SMTP timeout".to_string(),
            "done 3 1".to_string(),
        ]
    );
}

// ── Async entry points: failures before pdfium is needed ────────────────────

#[test]
fn inspect_missing_file_is_not_found() {
    let result = tokio_test::block_on(inspect("/definitely/not/a/real/folha.pdf", None));
    assert!(matches!(result, Err(DocumentError::FileNotFound { .. })));
}

#[tokio::test]
async fn dispatch_rejects_non_pdf_upload() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"nome;email\nJOAO;joao@example.com\n").unwrap();
    let dir = company();

    let result = dispatch(
        file.path(),
        &dir,
        &dir.select_all(),
        Arc::new(RecordingMailer::default()),
        &RunConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(DocumentError::NotAPdf { .. })));
}

#[tokio::test]
async fn dispatch_with_nobody_selected_fails_before_reading() {
    let dir = company();
    let result = dispatch(
        "/definitely/not/a/real/folha.pdf",
        &dir,
        &CandidateSet::default(),
        Arc::new(RecordingMailer::default()),
        &RunConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(DocumentError::NoCandidates)));
}
