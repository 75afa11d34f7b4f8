//! mailcraft - command line entry point
//!
//! ```text
//! mailcraft [--config <path>] send
//! mailcraft [--config <path>] receive [--keep] [--any-text]
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use mailcraft_common::config::{Config, LoggingConfig, TextParts};
use mailcraft_common::types::{SendEmail, SendSmtpCommand, TextPlainBody};
use mailcraft_core::{receive_from_server, send_smtp_email, ReceiveOptions};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage: mailcraft [--config <path>] <send | receive [--keep] [--any-text]>";

/// Token in the configured body replaced by the current local time
const NOW_TOKEN: &str = "{now}";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send,
    Receive { keep: bool, any_text: bool },
    Help,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    command: Command,
}

fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config = None;
    let mut command = None;
    let mut keep = false;
    let mut any_text = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path\n{}", USAGE))?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => command = Some("help".to_string()),
            "--keep" => keep = true,
            "--any-text" => any_text = true,
            "send" | "receive" if command.is_none() => command = Some(arg.clone()),
            other => bail!("unexpected argument: {}\n{}", other, USAGE),
        }
    }

    let command = match command.as_deref() {
        Some("help") => Command::Help,
        Some("send") => {
            if keep || any_text {
                bail!("--keep and --any-text only apply to receive\n{}", USAGE);
            }
            Command::Send
        }
        Some("receive") => Command::Receive { keep, any_text },
        _ => bail!("missing command\n{}", USAGE),
    };

    Ok(Args { config, command })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.logging);

    let result = match args.command {
        Command::Send => send(&config).await,
        Command::Receive { keep, any_text } => receive(&config, keep, any_text).await,
        Command::Help => Ok(()),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn send(config: &Config) -> Result<()> {
    let send_email = config
        .message
        .clone()
        .ok_or_else(|| anyhow!("No [message] section in configuration"))?;

    let command = SendSmtpCommand {
        smtp_server_config: config.smtp.clone(),
        smtp_login_credentials: config.smtp.credentials.clone(),
        send_email: expand_body(send_email),
    };

    send_smtp_email(&command).await?;
    info!("Message sent");

    Ok(())
}

async fn receive(config: &Config, keep: bool, any_text: bool) -> Result<()> {
    let mut options = ReceiveOptions::from(&config.pop3);
    options.keep |= keep;
    if any_text {
        options.text_parts = TextParts::Any;
    }

    let summary = receive_from_server(config.pop3.clone(), options).await?;
    info!(
        retrieved = summary.retrieved,
        deleted = summary.deleted,
        "Mailbox processed"
    );

    Ok(())
}

fn expand_body(mut send_email: SendEmail) -> SendEmail {
    if send_email.body.0.contains(NOW_TOKEN) {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        send_email.body = TextPlainBody(send_email.body.0.replace(NOW_TOKEN, &now));
    }
    send_email
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
