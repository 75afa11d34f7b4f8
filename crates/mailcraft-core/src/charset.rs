//! Output charsets
//!
//! Maps a charset label to the bytes encoder and to the header and body
//! transfer encodings used when that charset appears in a message.

use encoding_rs::{Encoding, EUC_JP, ISO_2022_JP, SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8};
use mailcraft_common::{Error, Result};

/// Encoding used for RFC 2047 encoded words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEncoding {
    /// Header text must be plain ASCII
    None,
    /// `B` encoding (base64)
    Base64,
    /// `Q` encoding (quoted-printable variant)
    QuotedPrintable,
}

impl HeaderEncoding {
    /// Encoding letter written inside an encoded word
    pub fn tag(self) -> Option<char> {
        match self {
            HeaderEncoding::None => None,
            HeaderEncoding::Base64 => Some('b'),
            HeaderEncoding::QuotedPrintable => Some('q'),
        }
    }
}

/// Content-Transfer-Encoding of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    SevenBit,
    Base64,
    QuotedPrintable,
}

impl BodyEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            BodyEncoding::SevenBit => "7bit",
            BodyEncoding::Base64 => "base64",
            BodyEncoding::QuotedPrintable => "quoted-printable",
        }
    }
}

/// Resolved output charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    name: String,
    encoding: Option<&'static Encoding>,
    header_encoding: HeaderEncoding,
    body_encoding: BodyEncoding,
}

impl Charset {
    /// Plain US-ASCII
    pub fn us_ascii() -> Self {
        Self {
            name: "us-ascii".to_string(),
            encoding: None,
            header_encoding: HeaderEncoding::None,
            body_encoding: BodyEncoding::SevenBit,
        }
    }

    /// UTF-8
    pub fn utf8() -> Self {
        Self {
            name: "utf-8".to_string(),
            encoding: Some(UTF_8),
            header_encoding: HeaderEncoding::Base64,
            body_encoding: BodyEncoding::Base64,
        }
    }

    /// ISO-2022-JP, 7bit bodies and base64 encoded words
    fn iso_2022_jp() -> Self {
        Self {
            name: "iso-2022-jp".to_string(),
            encoding: Some(ISO_2022_JP),
            header_encoding: HeaderEncoding::Base64,
            body_encoding: BodyEncoding::SevenBit,
        }
    }

    /// Resolve a charset label such as `utf-8`, `iso-2022-jp` or `shift_jis`
    pub fn from_label(label: &str) -> Result<Self> {
        let label = label.trim().to_ascii_lowercase();

        if matches!(label.as_str(), "us-ascii" | "ascii") {
            return Ok(Self::us_ascii());
        }

        let encoding = match label.as_str() {
            // Common aliases missing from the WHATWG label list
            "eucjp" => Some(EUC_JP),
            "cp932" => Some(SHIFT_JIS),
            _ => Encoding::for_label(label.as_bytes()),
        }
        .ok_or_else(|| Error::Encoding(format!("Unknown charset: {}", label)))?;

        if encoding == UTF_8 {
            return Ok(Self::utf8());
        }
        // Japanese legacy charsets go out as ISO-2022-JP
        if encoding == ISO_2022_JP || encoding == SHIFT_JIS || encoding == EUC_JP {
            return Ok(Self::iso_2022_jp());
        }

        if encoding == UTF_16LE || encoding == UTF_16BE {
            return Err(Error::Encoding(format!(
                "Charset {} cannot be used for mail output",
                label
            )));
        }

        let (header_encoding, body_encoding) = if is_latin(&label) {
            (HeaderEncoding::QuotedPrintable, BodyEncoding::QuotedPrintable)
        } else {
            (HeaderEncoding::Base64, BodyEncoding::Base64)
        };

        Ok(Self {
            name: label,
            encoding: Some(encoding),
            header_encoding,
            body_encoding,
        })
    }

    /// MIME name written into headers
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header_encoding(&self) -> HeaderEncoding {
        self.header_encoding
    }

    pub fn body_encoding(&self) -> BodyEncoding {
        self.body_encoding
    }

    /// Encode text into this charset
    ///
    /// Fails when the text contains characters the charset cannot represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let Some(encoding) = self.encoding else {
            if text.is_ascii() {
                return Ok(text.as_bytes().to_vec());
            }
            return Err(Error::Encoding(format!(
                "Text is not representable in {}",
                self.name
            )));
        };

        let (bytes, _, had_errors) = encoding.encode(text);
        if had_errors {
            return Err(Error::Encoding(format!(
                "Text is not representable in {}",
                self.name
            )));
        }

        Ok(bytes.into_owned())
    }
}

fn is_latin(label: &str) -> bool {
    label.starts_with("iso-8859-")
        || label.starts_with("iso8859-")
        || label.starts_with("windows-125")
        || label.starts_with("latin")
        || label.starts_with("cp125")
}
