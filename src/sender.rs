use thiserror::Error;

use crate::attachment::{validate_attachments, AttachmentSource, FsAttachments};
use crate::message::build_message;
use crate::request::{mask, SendRequest};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::transport::{Connector, MailTransport, SmtpConnector, TransportError};

#[derive(Error, Debug)]
pub enum SendError {
    #[error("Missing required configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("The {0} must not be empty")]
    EmptyField(&'static str),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("Failed to read attachment {path}: {source}")]
    AttachmentUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {field} address '{value}': {source}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Invalid attachment content type: {0}")]
    InvalidContentType(String),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Failed to open SMTP session: {0}")]
    Connect(#[source] TransportError),

    #[error("Delivery failed after {attempts} attempts: {source}")]
    DeliveryFailed {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Terminal result of one send call.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Sent { attempts: u32 },
    Failed { error: SendError, attempts: u32 },
}

impl DeliveryOutcome {
    fn failed(error: SendError) -> Self {
        let attempts = match &error {
            SendError::DeliveryFailed { attempts, .. } => *attempts,
            _ => 0,
        };
        DeliveryOutcome::Failed { error, attempts }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Sent { attempts } | DeliveryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn error(&self) -> Option<&SendError> {
        match self {
            DeliveryOutcome::Sent { .. } => None,
            DeliveryOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<u32, SendError> {
        match self {
            DeliveryOutcome::Sent { attempts } => Ok(attempts),
            DeliveryOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Sends single messages over SMTP, retrying failed submissions with backoff.
pub struct MailSender<C = SmtpConnector, A = FsAttachments, S = ThreadSleeper> {
    connector: C,
    attachments: A,
    sleeper: S,
    policy: RetryPolicy,
}

impl MailSender {
    pub fn new() -> Self {
        Self::with_parts(SmtpConnector, FsAttachments, ThreadSleeper)
    }
}

impl Default for MailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector, A: AttachmentSource, S: Sleeper> MailSender<C, A, S> {
    pub fn with_parts(connector: C, attachments: A, sleeper: S) -> Self {
        Self {
            connector,
            attachments,
            sleeper,
            policy: RetryPolicy::default(),
        }
    }

    /// Deliver `request`, blocking until it is accepted or the attempt budget is spent.
    ///
    /// Attachment handles and the transport session live only inside this call
    /// and are released on every return path.
    pub fn send(&self, request: &SendRequest) -> DeliveryOutcome {
        log::debug!(
            "send: subject={:?} to={:?} from={:?} html={} attachments={:?}",
            request.subject,
            request.to,
            request.sender(),
            request.is_html,
            request.attachments,
        );
        log::debug!(
            "send: server={}:{} username={} password={}",
            request.smtp.host,
            request.smtp.port,
            mask(&request.smtp.username),
            mask(&request.smtp.password),
        );

        match self.try_send(request) {
            Ok(attempts) => {
                log::info!("Email sent to {} after {} attempt(s)", request.to, attempts);
                DeliveryOutcome::Sent { attempts }
            }
            Err(e) => {
                log::error!("Failed to send email to {:?}: {}", request.to, e);
                DeliveryOutcome::failed(e)
            }
        }
    }

    fn try_send(&self, request: &SendRequest) -> Result<u32, SendError> {
        check_preconditions(request)?;

        log::info!("Validating {} attachment(s)", request.attachments.len());
        let mut handles = validate_attachments(&self.attachments, &request.attachments)?;

        log::info!("Building message '{}'", request.subject);
        let message = build_message(request, &mut handles)?;

        let session = self
            .connector
            .connect(&request.smtp)
            .map_err(SendError::Connect)?;

        let result = self.policy.run(&self.sleeper, |attempt| {
            log::info!(
                "Sending to {} (attempt {}/{})",
                request.to,
                attempt,
                self.policy.max_attempts()
            );
            session.submit(&message).map_err(|e| {
                if e.permanent {
                    log::debug!("Server reported a permanent failure; retrying anyway");
                }
                e
            })
        });

        result
            .map(|((), attempts)| attempts)
            .map_err(|exhausted| SendError::DeliveryFailed {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })
    }
}

fn check_preconditions(request: &SendRequest) -> Result<(), SendError> {
    if request.to.trim().is_empty() {
        return Err(SendError::MissingConfiguration("recipient address (MAIL_TO or --to)"));
    }
    if request.smtp.username.trim().is_empty() {
        return Err(SendError::MissingConfiguration("SMTP username (SMTP_USERNAME)"));
    }
    if request.smtp.password.trim().is_empty() {
        return Err(SendError::MissingConfiguration("SMTP password (SMTP_PASSWORD)"));
    }
    if request.subject.is_empty() {
        return Err(SendError::EmptyField("subject"));
    }
    if request.body.is_empty() {
        return Err(SendError::EmptyField("body"));
    }
    Ok(())
}
