//! SMTP Module
//!
//! Submits rendered messages through lettre's Tokio transport.

mod sender;

pub use sender::{envelope, send_smtp_email, submit, SmtpSender};
