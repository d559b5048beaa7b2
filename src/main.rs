use std::fs;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use mailsend::credentials::CredentialManager;
use mailsend::{Config, Draft, MailSender, SmtpSecurity};

/// Send an email over SMTP, retrying failed deliveries with backoff
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to config file (defaults to the user config directory)
    #[clap(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one email
    Send {
        /// Subject line
        #[clap(short, long)]
        subject: String,

        /// Message body
        #[clap(short, long, required_unless_present = "body_file", conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the message body from a file
        #[clap(long)]
        body_file: Option<String>,

        /// Send the body as HTML instead of plain text
        #[clap(long)]
        html: bool,

        /// Sender display name (defaults to MAIL_FROM_NAME, then the host name)
        #[clap(long)]
        from_name: Option<String>,

        /// Recipient address (defaults to MAIL_TO)
        #[clap(short, long)]
        to: Option<String>,

        /// File to attach; repeat for several, attached in order
        #[clap(short, long = "attach")]
        attachments: Vec<String>,
    },

    /// Save SMTP server settings to the config file
    Configure {
        /// SMTP server address
        #[clap(long)]
        smtp_server: Option<String>,

        /// SMTP server port
        #[clap(long)]
        smtp_port: Option<u16>,

        /// SMTP security (StartTLS, SSL)
        #[clap(long)]
        smtp_security: Option<String>,

        /// SMTP username
        #[clap(long)]
        smtp_username: Option<String>,

        /// Sender address, if different from the username
        #[clap(long)]
        from: Option<String>,

        /// Default recipient
        #[clap(long)]
        default_to: Option<String>,
    },

    /// Store the SMTP password in the system keyring
    StorePassword {
        #[clap(short, long)]
        username: String,

        #[clap(short, long)]
        password: String,
    },

    /// Remove the SMTP password from the system keyring
    DeletePassword {
        #[clap(short, long)]
        username: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config_path = shellexpand::tilde(&config_path).into_owned();
    let credentials = CredentialManager::default();

    match args.command {
        Commands::Send {
            subject,
            body,
            body_file,
            html,
            from_name,
            to,
            attachments,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => {
                    let path = shellexpand::tilde(&path).into_owned();
                    fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read body file {}", path))?
                }
                (None, None) => bail!("Either --body or --body-file is required"),
            };

            let mut config = Config::resolve(&config_path)
                .with_context(|| format!("Failed to load configuration from {}", config_path))?;
            credentials.fill_password(&mut config);

            let request = config.request(Draft {
                subject,
                body,
                is_html: html,
                from_name,
                to,
                attachments,
            });

            let attempts = MailSender::new().send(&request).into_result()?;
            println!("Email sent to {} ({} attempt(s))", request.to, attempts);
        }
        Commands::Configure {
            smtp_server,
            smtp_port,
            smtp_security,
            smtp_username,
            from,
            default_to,
        } => {
            let mut config = Config::load(&config_path)?;

            if let Some(security) = smtp_security {
                match SmtpSecurity::parse(&security) {
                    Some(security) => config.smtp_security = Some(security),
                    None => bail!(
                        "Invalid SMTP security setting '{}'. Use StartTLS or SSL",
                        security
                    ),
                }
            }
            if smtp_server.is_some() {
                config.smtp_server = smtp_server;
            }
            if smtp_port.is_some() {
                config.smtp_port = smtp_port;
            }
            if smtp_username.is_some() {
                config.smtp_username = smtp_username;
            }
            if from.is_some() {
                config.from_address = from;
            }
            if default_to.is_some() {
                config.default_recipient = default_to;
            }

            config
                .save(&config_path)
                .with_context(|| format!("Failed to save config to {}", config_path))?;
            println!("Configuration saved to {}", config_path);
        }
        Commands::StorePassword { username, password } => {
            credentials.store_password(&username, &password)?;
            println!("Password stored for {}", username);
        }
        Commands::DeletePassword { username } => {
            credentials.delete_password(&username)?;
            println!("Password removed for {}", username);
        }
    }

    Ok(())
}
