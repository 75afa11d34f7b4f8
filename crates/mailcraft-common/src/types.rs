//! Common types for mailcraft
//!
//! These are plain values describing a message before any MIME encoding
//! takes place. Conversion into wire form lives in `mailcraft-core`.

use serde::{Deserialize, Serialize};

use crate::config::SmtpServerConfig;

/// Default charset for composed messages
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Email address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Mailbox address (`local@domain`)
    pub address: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl EmailAddress {
    /// Create an address without a display name
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Create an address with a display name
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }

    /// Display name, treating an empty name as absent
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Domain part of the address, if any
    pub fn domain(&self) -> Option<&str> {
        self.address
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// An address already rendered for a header
///
/// Either `example@example.com` or `John Smith <example@example.com>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEmailAddress(pub String);

impl FormattedEmailAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FormattedEmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `Subject` header value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(pub String);

/// Generic header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailHeader {
    /// Header name
    pub name: String,
    /// Header value, not yet encoded
    pub value: String,
}

impl EmailHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `text/plain` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextPlainBody(pub String);

/// SMTP login credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpLoginCredentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpLoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpLoginCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// A message to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmail {
    /// Charset used for every encoded header and the body
    #[serde(default = "default_charset")]
    pub charset: String,

    #[serde(rename = "from")]
    pub sender_from: EmailAddress,

    #[serde(default)]
    pub to: Vec<EmailAddress>,

    #[serde(default)]
    pub cc: Vec<EmailAddress>,

    #[serde(default)]
    pub bcc: Vec<EmailAddress>,

    pub subject: Subject,

    pub body: TextPlainBody,
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl SendEmail {
    /// Whether at least one of `to`, `cc` and `bcc` is non-empty
    pub fn has_recipients(&self) -> bool {
        [&self.to, &self.cc, &self.bcc]
            .iter()
            .any(|recipients| !recipients.is_empty())
    }
}

/// Submission of a message over SMTP
#[derive(Debug, Clone)]
pub struct SendSmtpCommand {
    pub smtp_server_config: SmtpServerConfig,
    pub smtp_login_credentials: Option<SmtpLoginCredentials>,
    pub send_email: SendEmail,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SendEmail {
        SendEmail {
            charset: "utf-8".to_string(),
            sender_from: EmailAddress::with_name("foo@example.com", "ふうー"),
            to: vec![],
            cc: vec![],
            bcc: vec![],
            subject: Subject("test".to_string()),
            body: TextPlainBody("body".to_string()),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(EmailAddress::new("a@b").display_name(), None);
        assert_eq!(EmailAddress::with_name("a@b", "").display_name(), None);
        assert_eq!(EmailAddress::with_name("a@b", "A").display_name(), Some("A"));
    }

    #[test]
    fn test_domain() {
        assert_eq!(EmailAddress::new("bar@example.com").domain(), Some("example.com"));
        assert_eq!(EmailAddress::new("bar").domain(), None);
    }

    #[test]
    fn test_has_recipients() {
        let mut email = sample();
        assert!(!email.has_recipients());

        email.bcc.push(EmailAddress::new("bar@example.com"));
        assert!(email.has_recipients());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = SmtpLoginCredentials {
            user: "foo".to_string(),
            password: "secret".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("foo"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_deserialize_send_email() {
        let toml = r#"
from = { address = "foo@example.com", name = "ふうー" }
to = [{ address = "bar@example.com", name = "バー" }]
subject = "日本語メール"
body = "本文"
"#;
        let email: SendEmail = toml::from_str(toml).unwrap();
        assert_eq!(email.charset, "utf-8");
        assert_eq!(email.sender_from.display_name(), Some("ふうー"));
        assert_eq!(email.to.len(), 1);
        assert!(email.cc.is_empty());
        assert_eq!(email.subject, Subject("日本語メール".to_string()));
    }
}
