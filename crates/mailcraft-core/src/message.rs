//! Conversion of a [`SendEmail`] into a wire-ready message
//!
//! The conversion happens in two steps. [`convert_send_mime_email`] attaches
//! the message charset to every address, header and body part, and
//! [`convert_email_message`] renders those into an [`OutgoingMessage`].

use chrono::Local;
use mailcraft_common::types::{EmailAddress, EmailHeader, SendEmail};
use mailcraft_common::{Error, Result};
use uuid::Uuid;

use crate::address::{format_recipient_header, MimeEmailAddress};
use crate::body::{encode_mime_text, MimePart, MimeTextPlainPart};
use crate::charset::Charset;
use crate::header::MimeEmailHeader;

/// A [`SendEmail`] with a charset attached to every piece
#[derive(Debug, Clone)]
pub struct SendMimeEmail {
    pub sender_from: MimeEmailAddress,
    pub to: Vec<MimeEmailAddress>,
    pub cc: Vec<MimeEmailAddress>,
    pub bcc: Vec<MimeEmailAddress>,
    pub headers: Vec<MimeEmailHeader>,
    pub parts: Vec<MimeTextPlainPart>,
}

/// Body of an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Single(MimePart),
    Alternative { boundary: String, parts: Vec<MimePart> },
}

/// Rendered message plus the addresses needed for the SMTP envelope
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    headers: Vec<(String, String)>,
    body: MessageBody,
    sender: EmailAddress,
    recipients: Vec<EmailAddress>,
}

impl OutgoingMessage {
    /// Headers in output order; `Bcc` is never included
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Envelope sender
    pub fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    /// Envelope recipients: `to`, `cc` and `bcc`
    pub fn recipients(&self) -> &[EmailAddress] {
        &self.recipients
    }

    /// Render the message as CRLF-terminated bytes
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.headers {
            push_header(&mut out, name, value);
        }

        match &self.body {
            MessageBody::Single(part) => {
                for (name, value) in part.headers() {
                    push_header(&mut out, name, &value);
                }
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(&part.body);
            }
            MessageBody::Alternative { boundary, parts } => {
                push_header(
                    &mut out,
                    "Content-Type",
                    &format!("multipart/alternative; boundary=\"{}\"", boundary),
                );
                out.extend_from_slice(b"\r\n");
                for part in parts {
                    out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
                    for (name, value) in part.headers() {
                        push_header(&mut out, name, &value);
                    }
                    out.extend_from_slice(b"\r\n");
                    out.extend_from_slice(&part.body);
                    if !part.body.is_empty() && !part.body.ends_with(b"\r\n") {
                        out.extend_from_slice(b"\r\n");
                    }
                }
                out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
            }
        }

        out
    }
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Fail when the message has no recipient at all
pub fn validate_send_email(send_email: &SendEmail) -> Result<()> {
    if !send_email.has_recipients() {
        return Err(Error::Validation("No recipient specified.".to_string()));
    }

    Ok(())
}

/// Attach the message charset to every address, header and body part
pub fn convert_send_mime_email(send_email: &SendEmail) -> Result<SendMimeEmail> {
    let charset = Charset::from_label(&send_email.charset)?;

    let to_mime = |address: &EmailAddress| MimeEmailAddress::NonAscii {
        email_address: address.clone(),
        charset: charset.clone(),
    };

    let subject = EmailHeader::new("Subject", send_email.subject.0.clone());

    Ok(SendMimeEmail {
        sender_from: to_mime(&send_email.sender_from),
        to: send_email.to.iter().map(to_mime).collect(),
        cc: send_email.cc.iter().map(to_mime).collect(),
        bcc: send_email.bcc.iter().map(to_mime).collect(),
        headers: vec![MimeEmailHeader::NonAscii {
            email_header: subject,
            charset: charset.clone(),
        }],
        parts: vec![MimeTextPlainPart::new(send_email.body.clone(), charset)],
    })
}

/// Render a [`SendMimeEmail`] into an [`OutgoingMessage`]
pub fn convert_email_message(send_mime_email: &SendMimeEmail) -> Result<OutgoingMessage> {
    let body = create_body(&send_mime_email.parts)?;

    let mut headers = Vec::new();
    let from = std::slice::from_ref(&send_mime_email.sender_from);
    headers.push(("From".to_string(), format_recipient_header("From", from)?));
    for (name, addresses) in [("To", &send_mime_email.to), ("Cc", &send_mime_email.cc)] {
        if addresses.is_empty() {
            continue;
        }
        headers.push((name.to_string(), format_recipient_header(name, addresses)?));
    }
    for header in &send_mime_email.headers {
        headers.push((header.name().to_string(), header.to_header()?));
    }

    let sender = send_mime_email.sender_from.email_address().clone();
    headers.push(("Date".to_string(), Local::now().to_rfc2822()));
    headers.push(("Message-ID".to_string(), message_id(&sender)));
    headers.push(("MIME-Version".to_string(), "1.0".to_string()));

    let recipients = send_mime_email
        .to
        .iter()
        .chain(&send_mime_email.cc)
        .chain(&send_mime_email.bcc)
        .map(|a| a.email_address().clone())
        .collect();

    Ok(OutgoingMessage {
        headers,
        body,
        sender,
        recipients,
    })
}

/// Validate and convert in one step
pub fn build_message(send_email: &SendEmail) -> Result<OutgoingMessage> {
    validate_send_email(send_email)?;
    let send_mime_email = convert_send_mime_email(send_email)?;
    convert_email_message(&send_mime_email)
}

fn create_body(parts: &[MimeTextPlainPart]) -> Result<MessageBody> {
    match parts {
        [] => Ok(MessageBody::Single(encode_mime_text(
            "",
            "plain",
            &Charset::us_ascii(),
        )?)),
        [part] => Ok(MessageBody::Single(part.encoded_content()?)),
        parts => Ok(MessageBody::Alternative {
            boundary: format!("=_{}", Uuid::new_v4().simple()),
            parts: parts
                .iter()
                .map(MimeTextPlainPart::encoded_content)
                .collect::<Result<_>>()?,
        }),
    }
}

fn message_id(sender: &EmailAddress) -> String {
    let domain = sender.domain().unwrap_or("localhost");
    format!("<{}@{}>", Uuid::new_v4().simple(), domain)
}
