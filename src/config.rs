//! Configuration: per-run message settings, mail credentials, and the
//! configuration file that seeds the employee directory.
//!
//! Per-run behaviour lives in [`RunConfig`], built through
//! [`RunConfigBuilder`]. Long-lived settings (sender credentials, BCC
//! address, employee seed) come from a TOML file read once at start-up by
//! [`Settings::from_file`].

use crate::attribution::PREVIEW_CHARS;
use crate::directory::{seed_directory, EmployeeDirectory};
use crate::error::{ConfigError, DocumentError};
use crate::progress::ProgressCallback;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Default subject line of every outgoing message.
pub const DEFAULT_SUBJECT: &str = "Holerite - Pagamento";

/// Default body text of every outgoing message.
pub const DEFAULT_BODY: &str = "Segue em anexo seu holerite.\n\nAtt,\nFinanceiro";

/// Settings for a single dispatch run.
///
/// # Example
/// ```rust
/// use payslip_mailer::RunConfig;
///
/// let config = RunConfig::builder()
///     .subject("Holerite - Março")
///     .bcc("arquivo@example.com")
///     .build()
///     .unwrap();
/// assert_eq!(config.preview_chars, 100);
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Subject of every message. Default: [`DEFAULT_SUBJECT`].
    pub subject: String,

    /// Plain-text body of every message. Default: [`DEFAULT_BODY`].
    pub body: String,

    /// Blind copy receiving every message. Default: none.
    pub bcc: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Characters of normalized text kept for an unattributed page. Default: 100.
    pub preview_chars: usize,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
            bcc: None,
            password: None,
            preview_chars: PREVIEW_CHARS,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("subject", &self.subject)
            .field("body", &self.body)
            .field("bcc", &self.bcc)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("preview_chars", &self.preview_chars)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.config.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.config.body = body.into();
        self
    }

    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        self.config.bcc = if address.trim().is_empty() {
            None
        } else {
            Some(address)
        };
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, DocumentError> {
        let c = &self.config;
        if c.subject.trim().is_empty() {
            return Err(DocumentError::InvalidConfig(
                "Subject must not be empty".into(),
            ));
        }
        if let Some(ref bcc) = c.bcc {
            if !email_address::EmailAddress::is_valid(bcc.trim()) {
                return Err(DocumentError::InvalidConfig(format!(
                    "BCC address '{bcc}' is not a valid email address"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Mail transport ───────────────────────────────────────────────────────

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS from the first byte (port 465).
    ImplicitTls,
    /// Plain connection upgraded with STARTTLS (port 587).
    StartTls,
}

/// Outbound SMTP server for the configured sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpEndpoint {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
}

impl SmtpEndpoint {
    /// Pick the relay from the sender's domain.
    ///
    /// Gmail senders go through `smtp.gmail.com:465`; every other sender is
    /// treated as an Office 365 mailbox on `smtp.office365.com:587`.
    pub fn for_sender(sender: &str) -> Self {
        if sender.to_lowercase().contains("gmail.com") {
            Self {
                host: "smtp.gmail.com".into(),
                port: 465,
                security: SmtpSecurity::ImplicitTls,
            }
        } else {
            Self {
                host: "smtp.office365.com".into(),
                port: 587,
                security: SmtpSecurity::StartTls,
            }
        }
    }
}

/// Sender credentials and transport selection.
#[derive(Clone)]
pub struct MailConfig {
    pub sender: String,
    pub password: String,
    pub bcc: Option<String>,
    pub endpoint: SmtpEndpoint,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("bcc", &self.bcc)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// ── Configuration file ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default, alias = "config_email")]
    mail: Option<RawMail>,
    #[serde(default, alias = "funcionarios")]
    employees: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawMail {
    #[serde(default, alias = "email_fixo")]
    sender: Option<String>,
    #[serde(default, alias = "senha_fixa")]
    password: Option<String>,
    #[serde(default, alias = "email_copia")]
    bcc: Option<String>,
    #[serde(default)]
    smtp_host: Option<String>,
    #[serde(default)]
    smtp_port: Option<u16>,
}

/// Everything loaded from the configuration file.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` when the file has no `[mail]` section; sending is then disabled.
    pub mail: Option<MailConfig>,
    /// Seed of the employee directory.
    pub employees: EmployeeDirectory,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = toml::from_str(s)?;
        let employees = seed_directory(raw.employees)?;
        let mail = raw.mail.map(RawMail::validate).transpose()?;
        Ok(Self { mail, employees })
    }

    /// Mail settings, or an error naming what is missing.
    pub fn require_mail(&self) -> Result<&MailConfig, ConfigError> {
        self.mail.as_ref().ok_or(ConfigError::Missing("mail"))
    }
}

impl RawMail {
    fn validate(self) -> Result<MailConfig, ConfigError> {
        let sender = non_blank(self.sender).ok_or(ConfigError::Missing("mail.sender"))?;
        let password = non_blank(self.password).ok_or(ConfigError::Missing("mail.password"))?;
        if !email_address::EmailAddress::is_valid(&sender) {
            return Err(ConfigError::InvalidAddress {
                name: "mail.sender".into(),
                address: sender,
            });
        }
        let bcc = non_blank(self.bcc);
        if let Some(ref b) = bcc {
            if !email_address::EmailAddress::is_valid(b) {
                return Err(ConfigError::InvalidAddress {
                    name: "mail.bcc".into(),
                    address: b.clone(),
                });
            }
        }

        let mut endpoint = SmtpEndpoint::for_sender(&sender);
        if let Some(host) = non_blank(self.smtp_host) {
            endpoint.host = host;
        }
        if let Some(port) = self.smtp_port {
            endpoint.port = port;
            endpoint.security = if port == 465 {
                SmtpSecurity::ImplicitTls
            } else {
                SmtpSecurity::StartTls
            };
        }

        Ok(MailConfig {
            sender,
            password,
            bcc,
            endpoint,
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_config_defaults() {
        let c = RunConfig::default();
        assert_eq!(c.subject, "Holerite - Pagamento");
        assert!(c.body.starts_with("Segue em anexo"));
        assert_eq!(c.preview_chars, 100);
        assert!(c.bcc.is_none());
    }

    #[test]
    fn builder_rejects_blank_subject() {
        assert!(RunConfig::builder().subject("  ").build().is_err());
    }

    #[test]
    fn builder_rejects_bad_bcc_and_ignores_blank_one() {
        assert!(RunConfig::builder().bcc("nope").build().is_err());
        let c = RunConfig::builder().bcc("").build().unwrap();
        assert!(c.bcc.is_none());
    }

    #[test]
    fn debug_hides_password() {
        let c = RunConfig::builder().password("s3cret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("s3cret"));
    }

    #[test]
    fn endpoint_follows_sender_domain() {
        let gmail = SmtpEndpoint::for_sender("RH@Gmail.com");
        assert_eq!(gmail.host, "smtp.gmail.com");
        assert_eq!(gmail.port, 465);
        assert_eq!(gmail.security, SmtpSecurity::ImplicitTls);

        let other = SmtpEndpoint::for_sender("rh@empresa.com.br");
        assert_eq!(other.host, "smtp.office365.com");
        assert_eq!(other.port, 587);
        assert_eq!(other.security, SmtpSecurity::StartTls);
    }

    #[test]
    fn parses_native_layout_in_order() {
        let s = Settings::from_toml_str(
            r#"
            [mail]
            sender = "rh@gmail.com"
            password = "app-pass"
            bcc = "arquivo@example.com"

            [[employees]]
            name = "MARIA OLIVEIRA"
            email = "maria@example.com"

            [[employees]]
            name = "JOAO SILVA"
            address = "joao@example.com"
            "#,
        )
        .unwrap();

        let mail = s.require_mail().unwrap();
        assert_eq!(mail.sender, "rh@gmail.com");
        assert_eq!(mail.bcc.as_deref(), Some("arquivo@example.com"));
        assert_eq!(mail.endpoint.host, "smtp.gmail.com");
        assert_eq!(
            s.employees.names().collect::<Vec<_>>(),
            vec!["MARIA OLIVEIRA", "JOAO SILVA"]
        );
        assert!(!format!("{mail:?}").contains("app-pass"));
    }

    #[test]
    fn parses_legacy_secrets_layout() {
        let s = Settings::from_toml_str(
            r#"
            [config_email]
            email_fixo = "rh@empresa.com.br"
            senha_fixa = "x"
            email_copia = "copia@empresa.com.br"

            [funcionarios]
            "JOAO SILVA" = "joao@example.com"
            "CARLOS" = "carlos@example.com"
            "#,
        )
        .unwrap();

        let mail = s.require_mail().unwrap();
        assert_eq!(mail.endpoint.host, "smtp.office365.com");
        assert_eq!(mail.bcc.as_deref(), Some("copia@empresa.com.br"));
        assert_eq!(s.employees.address_of("CARLOS"), Some("carlos@example.com"));
        assert_eq!(s.employees.len(), 2);
    }

    #[test]
    fn legacy_table_keeps_file_order_for_matching() {
        let s = Settings::from_toml_str(
            r#"
            [funcionarios]
            "ZE" = "ze@example.com"
            "ANA SILVA" = "ana.silva@example.com"
            "ANA" = "ana@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(
            s.employees.select_all().names(),
            ["ZE", "ANA SILVA", "ANA"]
        );
    }

    #[test]
    fn smtp_override_switches_security_by_port() {
        let s = Settings::from_toml_str(
            r#"
            [mail]
            sender = "rh@gmail.com"
            password = "p"
            smtp_host = "mail.internal"
            smtp_port = 2525
            "#,
        )
        .unwrap();
        let ep = &s.require_mail().unwrap().endpoint;
        assert_eq!(ep.host, "mail.internal");
        assert_eq!(ep.port, 2525);
        assert_eq!(ep.security, SmtpSecurity::StartTls);
    }

    #[test]
    fn missing_password_is_reported() {
        let err = Settings::from_toml_str(
            r#"
            [mail]
            sender = "rh@gmail.com"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("mail.password")));
    }

    #[test]
    fn no_mail_section_disables_sending() {
        let s = Settings::from_toml_str("").unwrap();
        assert!(s.employees.is_empty());
        assert!(matches!(s.require_mail(), Err(ConfigError::Missing("mail"))));
    }

    #[test]
    fn from_file_reads_toml_on_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[employees]]\nname = \"ANA\"\nemail = \"ana@example.com\""
        )
        .unwrap();

        let s = Settings::from_file(file.path()).unwrap();
        assert!(s.mail.is_none());
        assert_eq!(s.employees.address_of("ANA"), Some("ana@example.com"));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = Settings::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
