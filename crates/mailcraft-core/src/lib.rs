//! mailcraft Core - MIME composition, SMTP submission and POP3 retrieval
//!
//! This crate turns plain message values into RFC 2047 / MIME encoded
//! messages, submits them over SMTP and reads mailboxes over POP3.

pub mod address;
pub mod body;
pub mod charset;
pub mod header;
pub mod message;
pub mod pop3;
pub mod receive;
pub mod rfc2047;
pub mod smtp;

pub use address::{format_email_address, format_recipient_header, MimeEmailAddress};
pub use body::{encode_mime_text, MimePart, MimeTextPlainPart};
pub use charset::{BodyEncoding, Charset, HeaderEncoding};
pub use header::MimeEmailHeader;
pub use message::{
    build_message, convert_email_message, convert_send_mime_email, validate_send_email,
    MessageBody, OutgoingMessage, SendMimeEmail,
};
pub use pop3::{Mailbox, MailboxStat, Pop3Client, Pop3Mailbox};
pub use receive::{
    receive_all, receive_from_server, ReceiveOptions, ReceiveSummary, ReceivedEmail, ReceivedPart,
};
pub use smtp::{send_smtp_email, SmtpSender};
