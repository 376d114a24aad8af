//! Outbound mail: one message, one attachment, one recipient.
//!
//! The dispatcher talks to a [`Mailer`]. [`SmtpMailer`] delivers through
//! `lettre`'s blocking SMTP transport. [`DryRunMailer`] only logs, and can
//! write each attachment to a directory for review before a real run.
//!
//! Calls are synchronous and never retried: a failure comes back as
//! [`SendError`] and the run moves on.

use crate::config::{MailConfig, SmtpSecurity};
use crate::error::SendError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Attachment name for an employee's slip.
pub fn attachment_filename(employee: &str) -> String {
    format!("Holerite_{employee}.pdf")
}

/// One outgoing message.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to: String,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub attachment_filename: String,
    pub attachment: Vec<u8>,
}

/// Confirmation of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub recipient: String,
}

/// Delivers messages. Implementations block until the transport answers.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &OutgoingMessage) -> Result<Sent, SendError>;
}

// ── SMTP ─────────────────────────────────────────────────────────────────

/// Authenticated SMTP delivery through the configured relay.
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    /// Build the transport for `config.endpoint`, logging in as the sender.
    pub fn new(config: &MailConfig) -> Result<Self, SendError> {
        let from = parse_mailbox(&config.sender)?;
        let credentials = Credentials::new(config.sender.clone(), config.password.clone());
        let endpoint = &config.endpoint;

        let builder = match endpoint.security {
            SmtpSecurity::ImplicitTls => SmtpTransport::relay(&endpoint.host),
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&endpoint.host),
        }
        .map_err(|e| SendError::Transport(e.to_string()))?;

        let transport = builder
            .port(endpoint.port)
            .credentials(credentials)
            .build();

        info!(
            "SMTP relay {}:{} ({:?}) as {}",
            endpoint.host, endpoint.port, endpoint.security, config.sender
        );
        Ok(Self { from, transport })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<Sent, SendError> {
        let email = build_message(self.from.clone(), message)?;
        self.transport
            .send(&email)
            .map_err(|e| SendError::Transport(e.to_string()))?;
        debug!("Delivered {} to {}", message.attachment_filename, message.to);
        Ok(Sent {
            recipient: message.to.clone(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| SendError::InvalidAddress {
            address: address.to_string(),
            detail: e.to_string(),
        })
}

/// Assemble a `multipart/mixed` message: plain-text body plus the PDF.
fn build_message(from: Mailbox, message: &OutgoingMessage) -> Result<Message, SendError> {
    let mut builder = Message::builder()
        .from(from)
        .to(parse_mailbox(&message.to)?)
        .subject(message.subject.clone());
    if let Some(ref bcc) = message.bcc {
        builder = builder.bcc(parse_mailbox(bcc)?);
    }

    let pdf = ContentType::parse("application/pdf")
        .map_err(|e| SendError::Build(e.to_string()))?;
    let attachment =
        Attachment::new(message.attachment_filename.clone()).body(message.attachment.clone(), pdf);

    builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(message.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|e| SendError::Build(e.to_string()))
}

// ── Dry run ──────────────────────────────────────────────────────────────

/// Logs every message instead of sending it.
///
/// With an output directory, each attachment is also written there under
/// its attachment name.
#[derive(Debug, Clone, Default)]
pub struct DryRunMailer {
    out_dir: Option<PathBuf>,
}

impl DryRunMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: Some(dir.into()),
        }
    }
}

impl Mailer for DryRunMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<Sent, SendError> {
        parse_mailbox(&message.to)?;

        if let Some(ref dir) = self.out_dir {
            let path = write_new_file(dir, &message.attachment_filename, &message.attachment)?;
            info!("[dry-run] {} -> {}", message.to, path.display());
        } else {
            info!(
                "[dry-run] {} -> {} ({} bytes)",
                message.attachment_filename,
                message.to,
                message.attachment.len()
            );
        }

        Ok(Sent {
            recipient: message.to.clone(),
        })
    }
}

/// Write `bytes` under `filename` in `dir` without replacing an existing file.
///
/// An employee owning several pages gets `Holerite_<name>_2.pdf`,
/// `Holerite_<name>_3.pdf`, and so on.
fn write_new_file(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, SendError> {
    let filename = filename.replace(['/', '\\'], "_");
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (filename.clone(), String::new()),
    };
    let write_error = |path: &Path, e: io::Error| SendError::Write {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;
    let mut n = 1u32;
    loop {
        let path = if n == 1 {
            dir.join(&filename)
        } else {
            dir.join(format!("{stem}_{n}{ext}"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(bytes)
                    .map_err(|e| write_error(path.as_path(), e))?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", path.display());
                n += 1;
            }
            Err(e) => return Err(write_error(path.as_path(), e)),
        }
    }
}
