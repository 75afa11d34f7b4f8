//! MIME bodies

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mailcraft_common::types::TextPlainBody;
use mailcraft_common::Result;

use crate::charset::{BodyEncoding, Charset};

const BASE64_LINE_LEN: usize = 76;

/// Longest 7bit body line, excluding CRLF
const MAX_BODY_LINE_LEN: usize = 998;

/// A single, encoded, non-multipart MIME entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    /// Full `Content-Type` value, e.g. `text/plain; charset="utf-8"`
    pub content_type: String,
    pub transfer_encoding: BodyEncoding,
    /// Encoded body with CRLF line endings
    pub body: Vec<u8>,
}

impl MimePart {
    /// Content headers of this part, in output order
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type.clone()),
            (
                "Content-Transfer-Encoding",
                self.transfer_encoding.as_str().to_string(),
            ),
        ]
    }
}

/// `text/plain` part in a given charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTextPlainPart {
    pub body: TextPlainBody,
    pub charset: Charset,
}

impl MimeTextPlainPart {
    pub fn new(body: TextPlainBody, charset: Charset) -> Self {
        Self { body, charset }
    }

    pub fn encoded_content(&self) -> Result<MimePart> {
        encode_mime_text(&self.body.0, "plain", &self.charset)
    }
}

/// Build a `text/<subtype>` part
pub fn encode_mime_text(body: &str, subtype: &str, charset: &Charset) -> Result<MimePart> {
    let text = normalize_line_endings(body);

    let encoded = match charset.body_encoding() {
        BodyEncoding::Base64 => base64_lines(&charset.encode(&text)?),
        BodyEncoding::QuotedPrintable => {
            let mut encoded = quoted_printable::encode(charset.encode(&text)?);
            ensure_trailing_crlf(&mut encoded);
            encoded
        }
        BodyEncoding::SevenBit => {
            let mut encoded = encode_wrapped(&text, charset)?;
            ensure_trailing_crlf(&mut encoded);
            encoded
        }
    };

    Ok(MimePart {
        content_type: format!("text/{}; charset=\"{}\"", subtype, charset.name()),
        transfer_encoding: charset.body_encoding(),
        body: encoded,
    })
}

/// Convert any mix of LF and CRLF to CRLF
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

fn base64_lines(bytes: &[u8]) -> Vec<u8> {
    let encoded = STANDARD.encode(bytes);
    let mut out = Vec::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LEN * 2 + 2);
    for line in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Encode CRLF separated text, breaking lines longer than
/// [`MAX_BODY_LINE_LEN`] octets on character boundaries
fn encode_wrapped(text: &str, charset: &Charset) -> Result<Vec<u8>> {
    let mut lines = Vec::new();

    for line in text.split("\r\n") {
        let encoded = charset.encode(line)?;
        if encoded.len() <= MAX_BODY_LINE_LEN {
            lines.push(encoded);
            continue;
        }

        let mut chunk = String::new();
        let mut chunk_bytes = Vec::new();
        for ch in line.chars() {
            let mut candidate = chunk.clone();
            candidate.push(ch);
            let bytes = charset.encode(&candidate)?;

            if bytes.len() > MAX_BODY_LINE_LEN && !chunk.is_empty() {
                lines.push(std::mem::take(&mut chunk_bytes));
                chunk.clear();
                chunk.push(ch);
                chunk_bytes = charset.encode(&chunk)?;
            } else {
                chunk = candidate;
                chunk_bytes = bytes;
            }
        }
        lines.push(chunk_bytes);
    }

    Ok(lines.join(&b"\r\n"[..]))
}

fn ensure_trailing_crlf(body: &mut Vec<u8>) {
    if !body.is_empty() && !body.ends_with(b"\r\n") {
        body.extend_from_slice(b"\r\n");
    }
}
