//! Reading a mailbox
//!
//! Messages are fetched oldest first, summarized on an output stream and,
//! unless asked to keep them, deleted from the server.

use encoding_rs::{Encoding, UTF_8};
use mail_parser::{Address, HeaderName, Message, MessageParser, MimeHeaders, PartType};
use mailcraft_common::config::{Pop3ServerConfig, TextParts};
use mailcraft_common::{Error, Result};
use std::io::Write;
use tracing::{debug, error, info, warn};

use crate::pop3::{Mailbox, Pop3Mailbox};

/// Line printed around each message report
pub const SEPARATOR_WIDTH: usize = 80;

/// Options for [`receive_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Leave messages on the server
    pub keep: bool,
    /// Which parts are printed as text
    pub text_parts: TextParts,
}

impl From<&Pop3ServerConfig> for ReceiveOptions {
    fn from(config: &Pop3ServerConfig) -> Self {
        Self {
            keep: config.keep,
            text_parts: config.text_parts,
        }
    }
}

/// Leaf part of a received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedPart {
    Text { content_type: String, text: String },
    Unsupported { content_type: String },
}

/// Decoded summary of a received message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
    pub subject: Option<String>,
    pub parts: Vec<ReceivedPart>,
}

/// Counters of a [`receive_all`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    pub retrieved: u32,
    pub deleted: u32,
}

impl ReceivedEmail {
    /// Parse raw message bytes
    pub fn parse(raw: &[u8], text_parts: TextParts) -> Result<Self> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| Error::Parse("Failed to parse message".to_string()))?;

        let mut parts = Vec::new();
        collect_parts(&message, text_parts, &mut parts);

        Ok(Self {
            from: message.from().map(format_addresses),
            to: message.to().map(format_addresses),
            date: message
                .header_raw(HeaderName::Date)
                .map(|d| d.trim().to_string()),
            subject: message.subject().map(str::to_string),
            parts,
        })
    }

    /// Write the report for message `number`
    pub fn write_report<W: Write>(&self, number: u32, out: &mut W) -> std::io::Result<()> {
        let separator = "-".repeat(SEPARATOR_WIDTH);

        writeln!(out, "email: {}", number)?;
        writeln!(out, "{}", separator)?;
        writeln!(out, "From: {}", self.from.as_deref().unwrap_or_default())?;
        writeln!(out, "To: {}", self.to.as_deref().unwrap_or_default())?;
        writeln!(out, "Date: {}", self.date.as_deref().unwrap_or_default())?;
        writeln!(out, "Subject: {}", self.subject.as_deref().unwrap_or_default())?;
        for part in &self.parts {
            match part {
                ReceivedPart::Text { text, .. } => writeln!(out, "Text:\n {}", text)?,
                ReceivedPart::Unsupported { content_type } => {
                    writeln!(out, "Unsupported mail content: {}", content_type)?
                }
            }
        }
        writeln!(out, "{}", separator)?;

        Ok(())
    }
}

/// Flatten the leaf parts of a message, descending into attached messages
fn collect_parts(message: &Message<'_>, text_parts: TextParts, parts: &mut Vec<ReceivedPart>) {
    for part in &message.parts {
        if let PartType::Multipart(_) = part.body {
            continue;
        }
        if let PartType::Message(nested) = &part.body {
            collect_parts(nested, text_parts, parts);
            continue;
        }

        let (ctype, subtype, charset) = match part.content_type() {
            Some(ct) => (
                ct.ctype().to_ascii_lowercase(),
                ct.subtype().map(str::to_ascii_lowercase),
                ct.attribute("charset").map(str::to_string),
            ),
            None => ("text".to_string(), Some("plain".to_string()), None),
        };
        let content_type = match &subtype {
            Some(subtype) => format!("{}/{}", ctype, subtype),
            None => ctype.clone(),
        };

        let wanted = ctype == "text"
            && match text_parts {
                TextParts::Plain => subtype.as_deref() == Some("plain"),
                TextParts::Any => true,
            };

        let text = match &part.body {
            PartType::Text(text) | PartType::Html(text) if wanted => Some(text.to_string()),
            PartType::Binary(bytes) | PartType::InlineBinary(bytes) if wanted => {
                Some(decode_text(bytes, charset.as_deref()))
            }
            _ => None,
        };

        parts.push(match text {
            Some(text) => ReceivedPart::Text {
                content_type,
                text: if charset.is_none() {
                    // Undeclared charset: keep what decodes as ASCII
                    text.chars().filter(char::is_ascii).collect()
                } else {
                    text
                },
            },
            None => ReceivedPart::Unsupported { content_type },
        });
    }
}

/// Decode undecoded text bytes with the declared charset, UTF-8 otherwise
fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn format_addresses(address: &Address<'_>) -> String {
    let addrs: Vec<String> = match address {
        Address::List(list) => list.iter().map(format_addr).collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .map(format_addr)
            .collect(),
    };
    addrs.join(", ")
}

fn format_addr(addr: &mail_parser::Addr<'_>) -> String {
    match (addr.name.as_deref(), addr.address.as_deref()) {
        (Some(name), Some(address)) => format!("{} <{}>", name, address),
        (Some(name), None) => name.to_string(),
        (None, Some(address)) => address.to_string(),
        (None, None) => String::new(),
    }
}

/// Print and (unless `keep`) delete every message, oldest first
///
/// The session is always closed with `QUIT`, also when the loop failed.
pub fn receive_all<M, W>(
    mailbox: &mut M,
    options: ReceiveOptions,
    out: &mut W,
) -> Result<ReceiveSummary>
where
    M: Mailbox + ?Sized,
    W: Write,
{
    let result = receive_messages(mailbox, options, out);

    match (result, mailbox.quit()) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), quit) => {
            if let Err(quit_err) = quit {
                warn!("QUIT after failure also failed: {}", quit_err);
            }
            Err(e)
        }
    }
}

fn receive_messages<M, W>(
    mailbox: &mut M,
    options: ReceiveOptions,
    out: &mut W,
) -> Result<ReceiveSummary>
where
    M: Mailbox + ?Sized,
    W: Write,
{
    let stat = mailbox.stat()?;
    info!(count = stat.count, size = stat.size, "Mailbox status");

    let mut summary = ReceiveSummary::default();
    for number in 1..=stat.count {
        let raw = mailbox.retrieve(number)?;
        let email = ReceivedEmail::parse(&raw, options.text_parts)?;
        summary.retrieved += 1;

        email.write_report(number, out)?;

        if options.keep {
            debug!(number, "Keeping message");
            continue;
        }

        writeln!(out)?;
        writeln!(out, "Remove:  {}", number)?;
        let reply = mailbox.delete(number)?;
        writeln!(out, "{}", reply)?;
        writeln!(out)?;
        summary.deleted += 1;
    }

    out.flush()?;
    Ok(summary)
}

/// Connect to the configured server and run [`receive_all`] on stdout
///
/// The POP3 session runs on the blocking thread pool; a panic in the client
/// is reported as an error.
pub async fn receive_from_server(
    config: Pop3ServerConfig,
    options: ReceiveOptions,
) -> Result<ReceiveSummary> {
    let handle = tokio::task::spawn_blocking(move || {
        let mut mailbox = Pop3Mailbox::connect(&config)?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        receive_all(&mut mailbox, options, &mut out)
    });

    match handle.await {
        Ok(result) => result,
        Err(e) => {
            error!("POP3 session aborted: {}", e);
            Err(Error::Pop3(format!("POP3 session aborted: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::build_message;
    use mailcraft_common::types::{EmailAddress, SendEmail, Subject, TextPlainBody};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct MemoryMailbox {
        messages: Vec<Vec<u8>>,
        deleted: Vec<u32>,
        retrieved: Vec<u32>,
        quit: bool,
        fail_retrieve: Option<u32>,
    }

    impl Mailbox for MemoryMailbox {
        fn stat(&mut self) -> Result<crate::pop3::MailboxStat> {
            Ok(crate::pop3::MailboxStat {
                count: self.messages.len() as u32,
                size: self.messages.iter().map(|m| m.len() as u64).sum(),
            })
        }

        fn retrieve(&mut self, number: u32) -> Result<Vec<u8>> {
            if self.fail_retrieve == Some(number) {
                return Err(Error::Pop3(format!("RETR {} failed", number)));
            }
            self.retrieved.push(number);
            Ok(self.messages[number as usize - 1].clone())
        }

        fn delete(&mut self, number: u32) -> Result<String> {
            self.deleted.push(number);
            Ok(format!("+OK message {} deleted", number))
        }

        fn quit(&mut self) -> Result<()> {
            self.quit = true;
            Ok(())
        }
    }

    fn japanese_message(subject: &str) -> Vec<u8> {
        build_message(&SendEmail {
            charset: "utf-8".to_string(),
            sender_from: EmailAddress::with_name("foo@example.com", "ふうー"),
            to: vec![EmailAddress::with_name("bar@example.com", "バー")],
            cc: vec![],
            bcc: vec![],
            subject: Subject(subject.to_string()),
            body: TextPlainBody("日本語を含む電子メール送信の送信テスト。\n".to_string()),
        })
        .unwrap()
        .formatted()
    }

    fn mixed_message() -> Vec<u8> {
        let (jis, _, _) = encoding_rs::ISO_2022_JP.encode("日本語");
        let mut raw = Vec::new();
        raw.extend_from_slice(
            b"From: sender@example.com\r\n\
              To: bar@example.com\r\n\
              Subject: mixed\r\n\
              Date: Mon, 19 Oct 2026 10:00:00 +0900\r\n\
              MIME-Version: 1.0\r\n\
              Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
              \r\n\
              --XX\r\n\
              Content-Type: text/plain; charset=\"iso-2022-jp\"\r\n\
              Content-Transfer-Encoding: 7bit\r\n\
              \r\n",
        );
        raw.extend_from_slice(&jis);
        raw.extend_from_slice(
            b"\r\n\
              --XX\r\n\
              Content-Type: text/html; charset=\"us-ascii\"\r\n\
              \r\n\
              <p>hello</p>\r\n\
              --XX\r\n\
              Content-Type: image/png\r\n\
              Content-Transfer-Encoding: base64\r\n\
              \r\n\
              iVBORw0KGgo=\r\n\
              --XX--\r\n",
        );
        raw
    }

    #[test]
    fn test_parse_encoded_headers() {
        let subject = "日本語メール".repeat(12);
        let email = ReceivedEmail::parse(&japanese_message(&subject), TextParts::Plain).unwrap();

        assert_eq!(email.from.as_deref(), Some("ふうー <foo@example.com>"));
        assert_eq!(email.to.as_deref(), Some("バー <bar@example.com>"));
        assert_eq!(email.subject.as_deref(), Some(subject.as_str()));
        assert!(email.date.is_some());

        assert_eq!(email.parts.len(), 1);
        match &email.parts[0] {
            ReceivedPart::Text { content_type, text } => {
                assert_eq!(content_type, "text/plain");
                assert!(text.contains("日本語を含む電子メール送信の送信テスト。"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mixed_plain_only() {
        let email = ReceivedEmail::parse(&mixed_message(), TextParts::Plain).unwrap();

        let kinds: Vec<(&str, bool)> = email
            .parts
            .iter()
            .map(|p| match p {
                ReceivedPart::Text { content_type, .. } => (content_type.as_str(), true),
                ReceivedPart::Unsupported { content_type } => (content_type.as_str(), false),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![("text/plain", true), ("text/html", false), ("image/png", false)]
        );

        match &email.parts[0] {
            ReceivedPart::Text { text, .. } => assert!(text.contains("日本語")),
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mixed_any_text() {
        let email = ReceivedEmail::parse(&mixed_message(), TextParts::Any).unwrap();
        match &email.parts[1] {
            ReceivedPart::Text { content_type, text } => {
                assert_eq!(content_type, "text/html");
                assert!(text.contains("hello"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
        assert!(matches!(&email.parts[2], ReceivedPart::Unsupported { .. }));
    }

    #[test]
    fn test_parse_attached_message() {
        let raw = b"From: a@example.com\r\n\
                    Subject: outer\r\n\
                    MIME-Version: 1.0\r\n\
                    Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
                    \r\n\
                    --XX\r\n\
                    Content-Type: text/plain; charset=\"us-ascii\"\r\n\
                    \r\n\
                    outer text\r\n\
                    --XX\r\n\
                    Content-Type: message/rfc822\r\n\
                    \r\n\
                    From: b@example.com\r\n\
                    Subject: inner\r\n\
                    Content-Type: text/plain; charset=\"us-ascii\"\r\n\
                    \r\n\
                    inner text\r\n\
                    --XX--\r\n";

        let email = ReceivedEmail::parse(raw, TextParts::Plain).unwrap();
        let texts: Vec<&str> = email
            .parts
            .iter()
            .map(|p| match p {
                ReceivedPart::Text { text, .. } => text.trim(),
                ReceivedPart::Unsupported { content_type } => content_type.as_str(),
            })
            .collect();
        assert_eq!(texts, vec!["outer text", "inner text"]);
        assert_eq!(email.subject.as_deref(), Some("outer"));
    }

    #[test]
    fn test_date_is_printed_as_sent() {
        let raw = b"From: a@example.com\r\n\
                    Date:  19 Oct 2026 garbage\r\n\
                    Subject: x\r\n\
                    \r\n\
                    body\r\n";
        let email = ReceivedEmail::parse(raw, TextParts::Plain).unwrap();
        assert_eq!(email.date.as_deref(), Some("19 Oct 2026 garbage"));

        let raw = b"From: a@example.com\r\n\
                    Date: Mon, 19 Oct 2026 10:00:00 +0900\r\n\
                    \r\n\
                    body\r\n";
        let email = ReceivedEmail::parse(raw, TextParts::Plain).unwrap();
        assert_eq!(email.date.as_deref(), Some("Mon, 19 Oct 2026 10:00:00 +0900"));
    }

    #[test]
    fn test_decode_text_uses_declared_charset() {
        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode("日本語");
        assert_eq!(decode_text(&sjis, Some("shift_jis")), "日本語");
        assert_eq!(decode_text("日本語".as_bytes(), None), "日本語");
        assert_eq!(decode_text("日本語".as_bytes(), Some("x-unknown")), "日本語");
    }

    #[test]
    fn test_missing_charset_keeps_ascii_only() {
        let raw = b"From: a@example.com\r\n\
                    Subject: x\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    caf\xe9 ok\r\n";
        let email = ReceivedEmail::parse(raw, TextParts::Plain).unwrap();
        match &email.parts[0] {
            ReceivedPart::Text { text, .. } => {
                assert!(text.is_ascii());
                assert!(text.starts_with("caf"));
                assert!(text.contains(" ok"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_report_format() {
        let email = ReceivedEmail {
            from: Some("ふうー <foo@example.com>".to_string()),
            to: Some("bar@example.com".to_string()),
            date: Some("Mon, 19 Oct 2026 10:00:00 +0900".to_string()),
            subject: Some("件名".to_string()),
            parts: vec![
                ReceivedPart::Text {
                    content_type: "text/plain".to_string(),
                    text: "本文".to_string(),
                },
                ReceivedPart::Unsupported {
                    content_type: "image/png".to_string(),
                },
            ],
        };

        let mut out = Vec::new();
        email.write_report(3, &mut out).unwrap();

        let separator = "-".repeat(SEPARATOR_WIDTH);
        let expected = format!(
            "email: 3\n{sep}\nFrom: ふうー <foo@example.com>\nTo: bar@example.com\n\
             Date: Mon, 19 Oct 2026 10:00:00 +0900\nSubject: 件名\nText:\n 本文\n\
             Unsupported mail content: image/png\n{sep}\n",
            sep = separator
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_receive_all_deletes_oldest_first() {
        let mut mailbox = MemoryMailbox {
            messages: vec![japanese_message("一通目"), japanese_message("二通目")],
            ..Default::default()
        };

        let mut out = Vec::new();
        let summary = receive_all(&mut mailbox, ReceiveOptions::default(), &mut out).unwrap();

        assert_eq!(summary, ReceiveSummary { retrieved: 2, deleted: 2 });
        assert_eq!(mailbox.retrieved, vec![1, 2]);
        assert_eq!(mailbox.deleted, vec![1, 2]);
        assert!(mailbox.quit);

        let out = String::from_utf8(out).unwrap();
        let first = out.find("Subject: 一通目").unwrap();
        let second = out.find("Subject: 二通目").unwrap();
        assert!(first < second);
        assert!(out.contains("\nRemove:  1\n+OK message 1 deleted\n\n"));
    }

    #[test]
    fn test_receive_all_keep() {
        let mut mailbox = MemoryMailbox {
            messages: vec![japanese_message("残す")],
            ..Default::default()
        };
        let options = ReceiveOptions {
            keep: true,
            text_parts: TextParts::Any,
        };

        let mut out = Vec::new();
        let summary = receive_all(&mut mailbox, options, &mut out).unwrap();

        assert_eq!(summary, ReceiveSummary { retrieved: 1, deleted: 0 });
        assert!(mailbox.deleted.is_empty());
        assert!(!String::from_utf8(out).unwrap().contains("Remove:"));
    }

    #[test]
    fn test_receive_all_quits_after_failure() {
        let mut mailbox = MemoryMailbox {
            messages: vec![japanese_message("a"), japanese_message("b")],
            fail_retrieve: Some(2),
            ..Default::default()
        };

        let mut out = Vec::new();
        let err = receive_all(&mut mailbox, ReceiveOptions::default(), &mut out).unwrap_err();

        assert!(matches!(err, Error::Pop3(_)));
        assert_eq!(mailbox.deleted, vec![1]);
        assert!(mailbox.quit);
    }

    #[test]
    fn test_empty_mailbox() {
        let mut mailbox = MemoryMailbox::default();
        let mut out = Vec::new();
        let summary = receive_all(&mut mailbox, ReceiveOptions::default(), &mut out).unwrap();

        assert_eq!(summary, ReceiveSummary::default());
        assert!(out.is_empty());
        assert!(mailbox.quit);
    }
}
