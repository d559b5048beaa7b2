use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::request::{SmtpSecurity, SmtpSettings};

/// A failed submission, as reported by the transport.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// The server rejected the message with a permanent (5xx) reply
    pub permanent: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            permanent: false,
        }
    }
}

impl From<lettre::transport::smtp::Error> for TransportError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Self {
            permanent: e.is_permanent(),
            message: e.to_string(),
        }
    }
}

/// An open, authenticated session able to submit messages.
///
/// The session is closed when the value is dropped.
pub trait MailTransport {
    fn submit(&self, message: &Message) -> Result<(), TransportError>;
}

/// Opens transport sessions for a given SMTP configuration.
pub trait Connector {
    type Session: MailTransport;

    fn connect(&self, smtp: &SmtpSettings) -> Result<Self::Session, TransportError>;
}

/// Per-attempt timeout when none is configured, same as lettre's own default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// `SmtpTransportBuilder::timeout(None)` disables the timeout entirely, so an
/// unset value is always replaced with [`DEFAULT_TIMEOUT`].
pub fn attempt_timeout(smtp: &SmtpSettings) -> Duration {
    smtp.timeout.unwrap_or(DEFAULT_TIMEOUT)
}

/// Connector producing real encrypted SMTP sessions through lettre.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpConnector;

pub struct SmtpSession {
    mailer: SmtpTransport,
}

impl Connector for SmtpConnector {
    type Session = SmtpSession;

    fn connect(&self, smtp: &SmtpSettings) -> Result<SmtpSession, TransportError> {
        let tls_params = TlsParameters::new(smtp.host.clone())?;
        let tls = match smtp.security {
            SmtpSecurity::SSL => Tls::Wrapper(tls_params),
            SmtpSecurity::StartTLS => Tls::Required(tls_params),
        };

        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let mailer = SmtpTransport::builder_dangerous(&smtp.host)
            .port(smtp.port)
            .tls(tls)
            .credentials(creds)
            .timeout(Some(attempt_timeout(smtp)))
            .build();

        log::info!(
            "SMTP session ready for {}:{} ({:?})",
            smtp.host,
            smtp.port,
            smtp.security
        );
        Ok(SmtpSession { mailer })
    }
}

impl MailTransport for SmtpSession {
    fn submit(&self, message: &Message) -> Result<(), TransportError> {
        let response = self.mailer.send(message)?;
        log::debug!("Server accepted message: {:?}", response.code());
        Ok(())
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        log::debug!("Closing SMTP session");
    }
}
