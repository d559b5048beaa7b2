use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transport encryption used for the SMTP session. Plaintext is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmtpSecurity {
    /// STARTTLS upgrade, required before authentication
    StartTLS,
    /// Implicit TLS from the first byte (SMTPS)
    SSL,
}

impl SmtpSecurity {
    /// Port 465 is the implicit TLS port; everything else upgrades with STARTTLS.
    pub fn for_port(port: u16) -> Self {
        if port == 465 {
            SmtpSecurity::SSL
        } else {
            SmtpSecurity::StartTLS
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "starttls" => Some(SmtpSecurity::StartTLS),
            "ssl" | "tls" | "smtps" => Some(SmtpSecurity::SSL),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: SmtpSecurity,
    /// Per-attempt network timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A fully resolved request for one outgoing email.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub from_display_name: String,
    pub from_address: String,
    pub to: String,
    pub attachments: Vec<String>,
    pub smtp: SmtpSettings,
}

impl SendRequest {
    /// Sender header value, composed literally as `Name <address>`.
    pub fn sender(&self) -> String {
        format!("{} <{}>", self.from_display_name, self.from_address)
    }
}

/// Render a secret as its presence only.
pub fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "********"
    }
}
