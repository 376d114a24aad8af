//! CLI binary for payslip-mailer.
//!
//! A thin shim over the library crate that maps CLI flags to the employee
//! directory, the candidate selection and `RunConfig`, then prints the
//! dispatch report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use payslip_mailer::config::{DEFAULT_BODY, DEFAULT_SUBJECT};
use payslip_mailer::{
    dispatch, inspect, CandidateSet, DryRunMailer, EmployeeDirectory, Mailer, ProgressCallback,
    RunConfig, RunProgressCallback, Settings, SmtpMailer,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Sending");
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_sent(&self, page_num: usize, total: usize, employee: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            employee
        ));
        self.bar.inc(1);
    }

    fn on_page_unattributed(&self, page_num: usize, total: usize, _preview: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("?"),
            page_num,
            total,
            dim("no owner identified")
        ));
        self.bar.inc(1);
    }

    fn on_delivery_error(&self, page_num: usize, total: usize, employee: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            employee,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, sent_count: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        if errors == 0 {
            eprintln!(
                "{} {} payslips sent from {} pages",
                green("✔"),
                bold(&sent_count.to_string()),
                total_pages
            );
        } else {
            eprintln!(
                "{} {} payslips sent from {} pages  ({} failed)",
                cyan("⚠"),
                bold(&sent_count.to_string()),
                total_pages,
                red(&errors.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Send every payslip to every employee in the directory
  payslip-mailer folha-marco.pdf

  # Check which names are read from each page (no mail config needed)
  payslip-mailer --inspect-only folha-marco.pdf

  # Only some employees, in this matching order
  payslip-mailer -s "ANA SILVA" -s "ANA" folha-marco.pdf

  # Add an employee for this run only
  payslip-mailer --add "PEDRO SANTOS=pedro@empresa.com.br" folha-marco.pdf

  # Rehearse: write the split pages to ./saida instead of sending
  payslip-mailer --dry-run --out-dir saida folha-marco.pdf

CONFIGURATION FILE (TOML):
  [mail]
  sender   = "rh@empresa.com.br"
  password = "app-password"
  bcc      = "arquivo@empresa.com.br"   # optional
  # smtp_host / smtp_port override the relay chosen from the sender domain:
  #   *@gmail.com -> smtp.gmail.com:465 (TLS), others -> smtp.office365.com:587 (STARTTLS)

  [[employees]]
  name  = "JOAO SILVA"
  email = "joao@empresa.com.br"

MATCHING:
  Page text and names are compared after collapsing whitespace and
  upper-casing. Accents are NOT removed: store names exactly as the PDF
  prints them (use --inspect-only to see the text).

ENVIRONMENT VARIABLES:
  PAYSLIP_CONFIG   Path to the configuration file
  PDFIUM_LIB_PATH  Path to an existing libpdfium
  RUST_LOG         Overrides the log filter
"#;

/// Split a payroll PDF per employee and email each payslip.
#[derive(Parser, Debug)]
#[command(
    name = "payslip-mailer",
    version,
    about = "Split a payroll PDF per employee and email each payslip",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Payroll PDF containing one payslip per page.
    #[arg(required_unless_present = "list_employees")]
    input: Option<PathBuf>,

    /// Configuration file with mail credentials and the employee directory.
    #[arg(short, long, env = "PAYSLIP_CONFIG", default_value = "payslip.toml")]
    config: PathBuf,

    /// Email subject.
    #[arg(long, env = "PAYSLIP_SUBJECT", default_value = DEFAULT_SUBJECT)]
    subject: String,

    /// Email body text.
    #[arg(long, env = "PAYSLIP_BODY", default_value = DEFAULT_BODY, conflicts_with = "body_file")]
    body: String,

    /// Read the email body from a text file.
    #[arg(long, env = "PAYSLIP_BODY_FILE")]
    body_file: Option<PathBuf>,

    /// Employee to include (repeatable; order is the matching order). Default: everyone.
    #[arg(short, long = "select", value_name = "NAME")]
    select: Vec<String>,

    /// Add an employee for this session only: "NAME=EMAIL" (repeatable).
    #[arg(long = "add", value_name = "NAME=EMAIL", value_parser = parse_employee)]
    add: Vec<(String, String)>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAYSLIP_PDF_PASSWORD")]
    password: Option<String>,

    /// Characters of page text shown for pages without an owner.
    #[arg(long, default_value_t = 100)]
    preview_chars: usize,

    /// Do not send anything; log each message instead.
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, write each split page into this directory.
    #[arg(long, requires = "dry_run")]
    out_dir: Option<PathBuf>,

    /// Print the employee directory and exit.
    #[arg(long)]
    list_employees: bool,

    /// Print the normalized text of every page, send nothing.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAYSLIP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAYSLIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report.
    #[arg(short, long, env = "PAYSLIP_QUIET")]
    quiet: bool,
}

/// Parse `--add "NAME=EMAIL"`.
fn parse_employee(s: &str) -> Result<(String, String), String> {
    let (name, email) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=EMAIL, got '{s}'"))?;
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() || email.is_empty() {
        return Err(format!("expected NAME=EMAIL, got '{s}'"));
    }
    Ok((name.to_string(), email.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports each page; keep library INFO logs
    // out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let input = cli.input.as_ref().context("No input PDF given")?;
        let pages = inspect(input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;
        println!(
            "{}",
            dim("Copy names EXACTLY as they appear below (case and accents as printed).")
        );
        for page in pages {
            println!("{} {}", bold(&format!("Page {}:", page.page_num)), page.text);
            println!("{}", dim("────────"));
        }
        return Ok(());
    }

    // ── Configuration ────────────────────────────────────────────────────
    let settings = Settings::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    let directory = cli
        .add
        .iter()
        .try_fold(settings.employees.clone(), |dir, (name, email)| {
            dir.add_employee(name.clone(), email.clone())
        })
        .context("Invalid --add entry")?;

    if cli.list_employees {
        print_directory(&directory);
        return Ok(());
    }

    let candidates = select_candidates(&cli, &directory)?;

    let mailer: Arc<dyn Mailer> = if cli.dry_run {
        let dry_run = match cli.out_dir {
            Some(ref dir) => DryRunMailer::with_output_dir(dir),
            None => DryRunMailer::new(),
        };
        Arc::new(dry_run)
    } else {
        let mail = settings
            .require_mail()
            .context("Mail sending is not configured")?;
        Arc::new(SmtpMailer::new(mail).context("Failed to set up SMTP transport")?)
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let bcc = settings.mail.as_ref().and_then(|m| m.bcc.clone());
    let config = build_config(&cli, bcc, progress_cb).await?;

    if !cli.quiet {
        eprintln!(
            "{} {} selected{}",
            cyan("◆"),
            bold(&candidates.len().to_string()),
            if cli.dry_run { dim("  (dry run)") } else { String::new() }
        );
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let input = cli.input.as_ref().context("No input PDF given")?;
    let report = dispatch(input, &directory, &candidates, mailer, &config)
        .await
        .context("Dispatch failed")?;

    println!("{}", report.summary(&candidates));
    Ok(())
}

/// Resolve `--select` against the directory; everyone when none given.
fn select_candidates(cli: &Cli, directory: &EmployeeDirectory) -> Result<CandidateSet> {
    let candidates = if cli.select.is_empty() {
        directory.select_all()
    } else {
        directory
            .select(&cli.select)
            .context("Invalid --select entry")?
    };
    if candidates.is_empty() {
        anyhow::bail!("No employees selected: the directory is empty. Add some with --add or the configuration file.");
    }
    Ok(candidates)
}

/// Map CLI args to `RunConfig`.
async fn build_config(
    cli: &Cli,
    bcc: Option<String>,
    progress: Option<ProgressCallback>,
) -> Result<RunConfig> {
    let body = if let Some(ref path) = cli.body_file {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read body from {:?}", path))?
    } else {
        cli.body.replace("\\n", "\n")
    };

    let mut builder = RunConfig::builder()
        .subject(cli.subject.clone())
        .body(body)
        .preview_chars(cli.preview_chars);

    if let Some(bcc) = bcc {
        builder = builder.bcc(bcc);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_directory(directory: &EmployeeDirectory) {
    if directory.is_empty() {
        println!("{}", dim("(no employees)"));
        return;
    }
    let width = directory.names().map(|n| n.chars().count()).max().unwrap_or(0);
    for employee in directory.iter() {
        println!("{:<width$}  {}", employee.name, dim(&employee.address));
    }
}
