//! Configuration for mailcraft

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{SendEmail, SmtpLoginCredentials};

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "MAILCRAFT";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SMTP configuration
    #[serde(default)]
    pub smtp: SmtpServerConfig,

    /// POP3 configuration
    #[serde(default)]
    pub pop3: Pop3ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Message submitted by `send`
    pub message: Option<SendEmail>,
}

/// Transport security for SMTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection
    #[default]
    None,
    /// Upgrade with STARTTLS
    Starttls,
    /// Implicit TLS
    Tls,
}

/// SMTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpServerConfig {
    /// Host name
    #[serde(default = "default_host")]
    pub host: String,

    /// Port number
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Transport security
    #[serde(default)]
    pub security: SmtpSecurity,

    /// Login credentials
    pub credentials: Option<SmtpLoginCredentials>,
}

impl Default for SmtpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_smtp_port(),
            connect_timeout_secs: default_connect_timeout(),
            security: SmtpSecurity::default(),
            credentials: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_connect_timeout() -> u64 {
    30
}

/// Which leaf parts are printed as text when reading a mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextParts {
    /// Only `text/plain`
    #[default]
    Plain,
    /// Any `text/*`
    Any,
}

/// POP3 server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Pop3ServerConfig {
    /// Host name
    #[serde(default = "default_host")]
    pub host: String,

    /// Port number
    #[serde(default = "default_pop3_port")]
    pub port: u16,

    /// Use implicit TLS
    #[serde(default)]
    pub tls: bool,

    /// Connect and read timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub timeout_secs: u64,

    /// Login user
    #[serde(default)]
    pub user: String,

    /// Login password
    #[serde(default)]
    pub password: String,

    /// Keep messages on the server after reading them
    #[serde(default)]
    pub keep: bool,

    /// Which parts are printed as text
    #[serde(default)]
    pub text_parts: TextParts,
}

impl std::fmt::Debug for Pop3ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pop3ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("user", &self.user)
            .field("password", &"***")
            .field("keep", &self.keep)
            .field("text_parts", &self.text_parts)
            .finish()
    }
}

impl Default for Pop3ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_pop3_port(),
            tls: false,
            timeout_secs: default_connect_timeout(),
            user: String::new(),
            password: String::new(),
            keep: false,
            text_parts: TextParts::default(),
        }
    }
}

fn default_pop3_port() -> u16 {
    110
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp: SmtpServerConfig::default(),
            pop3: Pop3ServerConfig::default(),
            logging: LoggingConfig::default(),
            message: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, with environment overrides
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        if !path.is_file() {
            return Err(crate::Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");

        Ok(config)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            PathBuf::from("./mailcraft.toml"),
            PathBuf::from("./config.toml"),
            PathBuf::from("/etc/mailcraft/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> crate::Result<()> {
        if self.smtp.host.trim().is_empty() {
            return Err(crate::Error::Config("smtp.host must not be empty".to_string()));
        }
        if self.smtp.port == 0 {
            return Err(crate::Error::Config("smtp.port must not be 0".to_string()));
        }
        if self.pop3.host.trim().is_empty() {
            return Err(crate::Error::Config("pop3.host must not be empty".to_string()));
        }
        if self.pop3.port == 0 {
            return Err(crate::Error::Config("pop3.port must not be 0".to_string()));
        }
        if self.pop3.timeout_secs == 0 {
            return Err(crate::Error::Config("pop3.timeout_secs must not be 0".to_string()));
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "logging.format must be \"text\" or \"json\", got \"{}\"",
                    other
                )))
            }
        }

        Ok(())
    }
}
