//! POP3 Module
//!
//! Mailbox access for mail retrieval: the [`Mailbox`] trait and a blocking
//! client that implements it over plain TCP or implicit TLS.

mod client;
mod mailbox;

pub use client::{Connection, Pop3Client, Pop3Mailbox};
pub use mailbox::{normalize_retr_lines, Mailbox, MailboxStat};
