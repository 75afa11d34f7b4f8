//! MIME headers

use mailcraft_common::types::EmailHeader;
use mailcraft_common::{Error, Result};

use crate::charset::Charset;
use crate::rfc2047::encode_header;

/// A header ready to be written into a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeEmailHeader {
    /// Value is written as is and must be ASCII
    Ascii(EmailHeader),
    /// Value is encoded in the given charset when needed
    NonAscii {
        email_header: EmailHeader,
        charset: Charset,
    },
}

impl MimeEmailHeader {
    pub fn name(&self) -> &str {
        match self {
            MimeEmailHeader::Ascii(header) => &header.name,
            MimeEmailHeader::NonAscii { email_header, .. } => &email_header.name,
        }
    }

    /// Encoded, folded header value
    pub fn to_header(&self) -> Result<String> {
        match self {
            MimeEmailHeader::Ascii(header) => {
                if !header.value.is_ascii() || header.value.contains(['\r', '\n']) {
                    return Err(Error::Encoding(format!(
                        "Header {} must be single-line ASCII",
                        header.name
                    )));
                }
                Ok(header.value.clone())
            }
            MimeEmailHeader::NonAscii {
                email_header,
                charset,
            } => encode_header(&email_header.name, &email_header.value, charset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ascii_header() {
        let header = MimeEmailHeader::Ascii(EmailHeader::new("Subject", "Test email"));
        assert_eq!(header.name(), "Subject");
        assert_eq!(header.to_header().unwrap(), "Test email");
    }

    #[test]
    fn test_ascii_header_rejects_non_ascii() {
        let header = MimeEmailHeader::Ascii(EmailHeader::new("Subject", "日本語"));
        assert!(header.to_header().is_err());
    }

    #[test]
    fn test_non_ascii_header() {
        let header = MimeEmailHeader::NonAscii {
            email_header: EmailHeader::new("Subject", "バー"),
            charset: Charset::utf8(),
        };
        assert_eq!(header.to_header().unwrap(), "=?utf-8?b?44OQ44O8?=");
    }
}
