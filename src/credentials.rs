use anyhow::{Context, Result};
use keyring::{Entry, Error as KeyringError};

use crate::config::Config;

/// SMTP passwords kept in the system keyring, keyed by SMTP username.
#[derive(Clone)]
pub struct CredentialManager {
    service: String,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self {
            service: "mailsend-smtp".to_string(),
        }
    }
}

impl CredentialManager {
    /// Store a password securely in the system keyring
    pub fn store_password(&self, username: &str, password: &str) -> Result<()> {
        let entry = Entry::new(&self.service, username).context("Failed to create keyring entry")?;

        entry
            .set_password(password)
            .context("Failed to store password in keyring")?;

        log::debug!("Password stored in keyring for {}", username);
        Ok(())
    }

    /// Retrieve a password from the system keyring
    pub fn get_password(&self, username: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, username).context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to retrieve password: {}", e)),
        }
    }

    /// Delete a password from the system keyring
    pub fn delete_password(&self, username: &str) -> Result<()> {
        let entry = Entry::new(&self.service, username).context("Failed to create keyring entry")?;

        match entry.delete_password() {
            Ok(()) => {
                log::debug!("Password deleted for {}", username);
                Ok(())
            }
            // Nothing stored, nothing to delete
            Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to delete password: {}", e)),
        }
    }

    /// Fill in a missing SMTP password from the keyring.
    ///
    /// Keyring failures are logged and leave the config untouched; the sender
    /// then reports the password as missing.
    pub fn fill_password(&self, config: &mut Config) {
        if config.smtp_password.is_some() {
            return;
        }
        let Some(username) = config.smtp_username.clone() else {
            return;
        };

        match self.get_password(&username) {
            Ok(Some(password)) => {
                log::debug!("Using keyring password for {}", username);
                config.smtp_password = Some(password);
            }
            Ok(None) => log::debug!("No keyring password stored for {}", username),
            Err(e) => log::warn!("Keyring lookup failed: {:#}", e),
        }
    }
}
