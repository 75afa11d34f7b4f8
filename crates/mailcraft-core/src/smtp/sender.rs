//! SMTP submission

use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use mailcraft_common::config::{SmtpSecurity, SmtpServerConfig};
use mailcraft_common::types::{EmailAddress, SendSmtpCommand, SmtpLoginCredentials};
use mailcraft_common::{Error, Result};
use std::fmt::{Debug, Display};
use std::time::Duration;
use tracing::{debug, info};

use crate::message::{build_message, OutgoingMessage};

/// SMTP client bound to one server
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpServerConfig,
}

impl SmtpSender {
    /// Build the transport; no connection is made until the first send
    pub fn new(
        config: SmtpServerConfig,
        credentials: Option<&SmtpLoginCredentials>,
    ) -> Result<Self> {
        let builder = match config.security {
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| Error::Smtp(format!("Failed to create SMTP transport: {}", e)))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| Error::Smtp(format!("Failed to create SMTP transport: {}", e)))?,
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        if let Some(credentials) = credentials {
            debug!(user = %credentials.user, "Using SMTP login");
            builder = builder.credentials(Credentials::new(
                credentials.user.clone(),
                credentials.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    pub fn config(&self) -> &SmtpServerConfig {
        &self.config
    }

    /// Submit a rendered message
    pub async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        info!(
            "Sending message via SMTP {}:{}",
            self.config.host, self.config.port
        );
        submit(&self.transport, message).await?;
        Ok(())
    }
}

/// Submit a message through any lettre transport using its explicit envelope
pub async fn submit<T>(transport: &T, message: &OutgoingMessage) -> Result<T::Ok>
where
    T: AsyncTransport + Sync,
    T::Ok: Debug,
    T::Error: Display,
{
    let envelope = envelope(message)?;
    let bytes = message.formatted();

    let response = transport
        .send_raw(&envelope, &bytes)
        .await
        .map_err(|e| Error::Smtp(format!("Failed to send email. {}", e)))?;

    info!(
        recipients = message.recipients().len(),
        size = bytes.len(),
        "Message accepted"
    );
    debug!("SMTP response: {:?}", response);

    Ok(response)
}

/// SMTP envelope of a message
pub fn envelope(message: &OutgoingMessage) -> Result<Envelope> {
    let from = parse_address(message.sender())?;
    let to = message
        .recipients()
        .iter()
        .map(parse_address)
        .collect::<Result<Vec<_>>>()?;

    Envelope::new(Some(from), to).map_err(|e| Error::Validation(format!("Invalid envelope: {}", e)))
}

fn parse_address(address: &EmailAddress) -> Result<Address> {
    address
        .address
        .parse()
        .map_err(|e| Error::Validation(format!("Invalid address {}: {}", address.address, e)))
}

/// Validate, convert and submit a message
pub async fn send_smtp_email(command: &SendSmtpCommand) -> Result<()> {
    let message = build_message(&command.send_email)?;
    let sender = SmtpSender::new(
        command.smtp_server_config.clone(),
        command.smtp_login_credentials.as_ref(),
    )?;

    sender.send(&message).await
}
