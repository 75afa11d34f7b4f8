//! RFC 2047 encoded words
//!
//! Non-ASCII header text is split into `=?charset?b?...?=` or
//! `=?charset?q?...?=` words. Words never split a character, each word is
//! encoded on its own, and folded lines stay within [`MAX_LINE_LEN`] columns.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mailcraft_common::{Error, Result};

use crate::charset::{Charset, HeaderEncoding};

/// Maximum physical header line length, excluding CRLF
pub const MAX_LINE_LEN: usize = 76;

/// Separator placed between folded encoded words
pub const FOLD: &str = "\r\n ";

const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

/// Whether the text has to be written as encoded words
pub fn needs_encoding(text: &str) -> bool {
    let printable = text
        .bytes()
        .all(|b| b == b'\t' || (0x20..0x7f).contains(&b));
    !printable || text.contains("=?")
}

/// Split `text` into encoded words in `charset`
///
/// `first_line_used` is the number of columns already taken on the first
/// line, e.g. `Subject: `.
pub fn encode_words(
    text: &str,
    charset: &Charset,
    first_line_used: usize,
) -> Result<Vec<String>> {
    let Some(tag) = charset.header_encoding().tag() else {
        if text.is_ascii() {
            return Ok(vec![text.to_string()]);
        }
        return Err(Error::Encoding(format!(
            "Header text is not representable in {}",
            charset.name()
        )));
    };

    let overhead = charset.name().len() + 7;
    let mut words = Vec::new();
    let mut chunk = String::new();
    let mut budget = line_budget(first_line_used, overhead);

    for ch in text.chars() {
        let mut candidate = chunk.clone();
        candidate.push(ch);

        let encoded = charset.encode(&candidate)?;
        if encoded_len(&encoded, charset.header_encoding()) <= budget || chunk.is_empty() {
            chunk = candidate;
            continue;
        }

        words.push(encode_word(&charset.encode(&chunk)?, charset.name(), tag));
        chunk.clear();
        chunk.push(ch);
        budget = line_budget(1, overhead);
    }

    if !chunk.is_empty() || words.is_empty() {
        words.push(encode_word(&charset.encode(&chunk)?, charset.name(), tag));
    }

    Ok(words)
}

/// Encode a header value, folding it when encoded words are needed
///
/// ASCII values are returned unchanged.
pub fn encode_header(name: &str, value: &str, charset: &Charset) -> Result<String> {
    if !needs_encoding(value) {
        return Ok(value.to_string());
    }

    let words = encode_words(value, charset, name.len() + 2)?;
    Ok(words.join(FOLD))
}

/// Quote an ASCII display name when it contains specials
pub fn quote_display_name(name: &str) -> String {
    if !name.contains(SPECIALS) {
        return name.to_string();
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

fn line_budget(used: usize, overhead: usize) -> usize {
    MAX_LINE_LEN.saturating_sub(used + overhead)
}

fn encode_word(bytes: &[u8], charset: &str, tag: char) -> String {
    let payload = match tag {
        'q' => q_encode(bytes),
        _ => STANDARD.encode(bytes),
    };
    format!("=?{}?{}?{}?=", charset, tag, payload)
}

fn encoded_len(bytes: &[u8], encoding: HeaderEncoding) -> usize {
    match encoding {
        HeaderEncoding::Base64 => bytes.len().div_ceil(3) * 4,
        HeaderEncoding::QuotedPrintable => bytes
            .iter()
            .map(|&b| if q_literal(b) || b == b' ' { 1 } else { 3 })
            .sum(),
        HeaderEncoding::None => bytes.len(),
    }
}

fn q_literal(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'!' | b'*' | b'+' | b'-' | b'/')
}

fn q_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for &b in bytes {
        if b == b' ' {
            out.push('_');
        } else if q_literal(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("={:02X}", b));
        }
    }
    out
}
