//! Mailbox abstraction

use mailcraft_common::Result;

/// Result of `STAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxStat {
    /// Number of messages
    pub count: u32,
    /// Mailbox size in octets
    pub size: u64,
}

/// A remote mailbox addressed by message number
///
/// Message numbers start at 1, and lower numbers are older messages.
pub trait Mailbox {
    fn stat(&mut self) -> Result<MailboxStat>;

    /// Raw message bytes with CRLF line endings
    fn retrieve(&mut self, number: u32) -> Result<Vec<u8>>;

    /// Mark a message for deletion; returns the server reply
    fn delete(&mut self, number: u32) -> Result<String>;

    /// End the session, committing deletions
    fn quit(&mut self) -> Result<()>;
}

/// Turn the lines of a `RETR` reply into message bytes
///
/// Drops the status line and the terminating `.`, reverses dot-stuffing and
/// terminates every line with CRLF. Lines are bytes; 8-bit content is kept.
pub fn normalize_retr_lines<L: AsRef<[u8]>>(lines: &[L]) -> Vec<u8> {
    let mut lines: Vec<&[u8]> = lines.iter().map(|l| trim_line_end(l.as_ref())).collect();

    if lines.first().is_some_and(|l| l.starts_with(b"+OK")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| *l == b".") {
        lines.pop();
    }

    let mut out = Vec::new();
    for line in lines {
        let line = if line.starts_with(b"..") { &line[1..] } else { line };
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub(super) fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_full_reply() {
        let lines = [
            "+OK 120 octets\r\n",
            "Subject: test\r\n",
            "\r\n",
            "..leading dot\r\n",
            "body\r\n",
            ".\r\n",
        ];
        let bytes = normalize_retr_lines(&lines);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Subject: test\r\n\r\n.leading dot\r\nbody\r\n"
        );
    }

    #[test]
    fn test_normalize_keeps_8bit_bytes() {
        let lines: [&[u8]; 4] = [b"+OK\r\n", b"\r\n", b"\x93\xfa\x96\x7b\r\n", b".\r\n"];
        assert_eq!(normalize_retr_lines(&lines), b"\r\n\x93\xfa\x96\x7b\r\n");
    }

    #[test]
    fn test_normalize_bare_lines() {
        let lines = vec!["Subject: test".to_string(), "".to_string(), "body".to_string()];
        let bytes = normalize_retr_lines(&lines);
        assert_eq!(bytes, b"Subject: test\r\n\r\nbody\r\n");
    }
}
