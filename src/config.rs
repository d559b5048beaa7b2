use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{SendRequest, SmtpSecurity, SmtpSettings};

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to create config directory")]
    CreateDirError,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings read from the config file and the environment.
///
/// Every field is optional; unset fields fall back to the defaults applied in
/// [`Config::smtp_settings`] and [`Config::request`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_security: Option<SmtpSecurity>,
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    pub default_recipient: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Per-message values supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub from_name: Option<String>,
    pub to: Option<String>,
    pub attachments: Vec<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path);

        // A missing file is the same as an empty one
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let path = Path::new(path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| ConfigError::CreateDirError)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// Default location, `<config dir>/mailsend/config.json`.
    pub fn default_path() -> String {
        dirs::config_dir()
            .map(|dir| dir.join("mailsend").join("config.json"))
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| "~/.config/mailsend/config.json".to_string())
    }

    /// Overlay environment variables on top of the file values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = var("SMTP_USERNAME") {
            self.smtp_username = Some(value);
        }
        if let Some(value) = var("SMTP_PASSWORD") {
            self.smtp_password = Some(value);
        }
        if let Some(value) = var("SMTP_SERVER") {
            self.smtp_server = Some(value);
        }
        if let Some(value) = var("SMTP_PORT") {
            let port = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "SMTP_PORT",
                value: value.clone(),
            })?;
            self.smtp_port = Some(port);
        }
        if let Some(value) = var("SMTP_SECURITY") {
            let security = SmtpSecurity::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                var: "SMTP_SECURITY",
                value: value.clone(),
            })?;
            self.smtp_security = Some(security);
        }
        if let Some(value) = var("SMTP_FROM") {
            self.from_address = Some(value);
        }
        if let Some(value) = var("SMTP_TIMEOUT") {
            let secs = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "SMTP_TIMEOUT",
                value: value.clone(),
            })?;
            self.timeout_secs = Some(secs);
        }
        if let Some(value) = var("MAIL_TO") {
            self.default_recipient = Some(value);
        }
        if let Some(value) = var("MAIL_FROM_NAME") {
            self.from_name = Some(value);
        }

        Ok(())
    }

    /// Load the file at `path`, then apply the process environment.
    pub fn resolve(path: &str) -> Result<Self, ConfigError> {
        let mut config = Config::load(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        let port = self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);
        SmtpSettings {
            host: self
                .smtp_server
                .clone()
                .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            port,
            username: self.smtp_username.clone().unwrap_or_default(),
            password: self.smtp_password.clone().unwrap_or_default(),
            security: self.smtp_security.unwrap_or_else(|| SmtpSecurity::for_port(port)),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Combine a draft with the resolved settings into a send request.
    ///
    /// Missing recipients and credentials are left empty; the sender reports them.
    pub fn request(&self, draft: Draft) -> SendRequest {
        let smtp = self.smtp_settings();
        let from_address = self
            .from_address
            .clone()
            .unwrap_or_else(|| smtp.username.clone());
        let from_display_name = draft
            .from_name
            .filter(|name| !name.is_empty())
            .or_else(|| self.from_name.clone())
            .unwrap_or_else(local_hostname);
        let to = draft
            .to
            .filter(|to| !to.is_empty())
            .or_else(|| self.default_recipient.clone())
            .unwrap_or_default();

        SendRequest {
            subject: draft.subject,
            body: draft.body,
            is_html: draft.is_html,
            from_display_name,
            from_address,
            to,
            attachments: draft.attachments,
            smtp,
        }
    }
}

pub fn local_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|e| {
            log::debug!("Could not read host name: {}", e);
            "localhost".to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn draft() -> Draft {
        Draft {
            subject: "Test".to_string(),
            body: "Test content".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let smtp = Config::default().smtp_settings();
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.security, SmtpSecurity::StartTLS);
        assert!(smtp.timeout.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config {
            smtp_server: Some("mail.file.example".to_string()),
            smtp_username: Some("file-user".to_string()),
            ..Default::default()
        };
        config
            .apply_env(env(&[
                ("SMTP_USERNAME", "env-user@example.com"),
                ("SMTP_PASSWORD", "pw"),
                ("SMTP_PORT", "465"),
                ("SMTP_TIMEOUT", "30"),
            ]))
            .unwrap();

        let smtp = config.smtp_settings();
        assert_eq!(smtp.host, "mail.file.example");
        assert_eq!(smtp.username, "env-user@example.com");
        assert_eq!(smtp.password, "pw");
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.security, SmtpSecurity::SSL);
        assert_eq!(smtp.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config {
            smtp_password: Some("from-file".to_string()),
            ..Default::default()
        };
        config.apply_env(env(&[("SMTP_PASSWORD", "  ")])).unwrap();
        assert_eq!(config.smtp_password.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        match config.apply_env(env(&[("SMTP_PORT", "smtp")])) {
            Err(ConfigError::InvalidValue { var, value }) => {
                assert_eq!(var, "SMTP_PORT");
                assert_eq!(value, "smtp");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_security_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("SMTP_SECURITY", "none")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { var: "SMTP_SECURITY", .. })));
    }

    #[test]
    fn test_request_defaults_sender_to_username() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("SMTP_USERNAME", "bot@example.com"),
                ("SMTP_PASSWORD", "pw"),
                ("MAIL_TO", "ops@example.com"),
                ("MAIL_FROM_NAME", "Nightly Build"),
            ]))
            .unwrap();

        let request = config.request(draft());
        assert_eq!(request.from_address, "bot@example.com");
        assert_eq!(request.to, "ops@example.com");
        assert_eq!(request.sender(), "Nightly Build <bot@example.com>");
    }

    #[test]
    fn test_request_explicit_values_win() {
        let config = Config {
            from_address: Some("alerts@example.com".to_string()),
            from_name: Some("Config Name".to_string()),
            default_recipient: Some("ops@example.com".to_string()),
            ..Default::default()
        };
        let request = config.request(Draft {
            from_name: Some("Override".to_string()),
            to: Some("me@example.com".to_string()),
            ..draft()
        });

        assert_eq!(request.from_address, "alerts@example.com");
        assert_eq!(request.from_display_name, "Override");
        assert_eq!(request.to, "me@example.com");
    }

    #[test]
    fn test_display_name_falls_back_to_hostname() {
        let request = Config::default().request(draft());
        assert_eq!(request.from_display_name, local_hostname());
        assert!(request.to.is_empty());
    }

    #[test]
    fn test_save_and_load_skips_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let path = path.to_string_lossy().into_owned();

        let config = Config {
            smtp_server: Some("smtp.example.com".to_string()),
            smtp_port: Some(2525),
            smtp_username: Some("bot".to_string()),
            smtp_password: Some("secret".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.smtp_port, Some(2525));
        assert_eq!(loaded.smtp_username.as_deref(), Some("bot"));
        assert!(loaded.smtp_password.is_none());
        assert!(!fs::read_to_string(&path).unwrap().contains("secret"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let loaded = Config::load("/definitely/not/here/config.json").unwrap();
        assert_eq!(loaded, Config::default());
    }
}
