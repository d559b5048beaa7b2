pub mod attachment;
pub mod config;
pub mod credentials;
pub mod message;
pub mod request;
pub mod retry;
pub mod sender;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, ConfigError, Draft};
pub use request::{SendRequest, SmtpSecurity, SmtpSettings};
pub use sender::{DeliveryOutcome, MailSender, SendError};
