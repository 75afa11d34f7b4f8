//! MIME email addresses

use mailcraft_common::types::{EmailAddress, FormattedEmailAddress};
use mailcraft_common::{Error, Result};

use crate::charset::Charset;
use crate::rfc2047::{encode_words, needs_encoding, quote_display_name, FOLD, MAX_LINE_LEN};

/// An address ready to be formatted into a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeEmailAddress {
    /// Display name must be plain ASCII
    Ascii(EmailAddress),
    /// Display name is encoded in the given charset when needed
    NonAscii {
        email_address: EmailAddress,
        charset: Charset,
    },
}

impl MimeEmailAddress {
    pub fn email_address(&self) -> &EmailAddress {
        match self {
            MimeEmailAddress::Ascii(email_address) => email_address,
            MimeEmailAddress::NonAscii { email_address, .. } => email_address,
        }
    }

    /// Render as `addr` or `Name <addr>`
    pub fn to_formatted(&self) -> Result<FormattedEmailAddress> {
        self.format_at(0).map(FormattedEmailAddress)
    }

    /// Render with `used` columns already taken on the current line
    fn format_at(&self, used: usize) -> Result<String> {
        let formatted = match self {
            MimeEmailAddress::Ascii(email_address) => {
                format_email_address(email_address, &Charset::us_ascii(), used)?
            }
            MimeEmailAddress::NonAscii {
                email_address,
                charset,
            } => format_email_address(email_address, charset, used)?,
        };
        Ok(formatted.0)
    }
}

/// Format an address, encoding a non-ASCII display name in `charset`
///
/// `used` is the number of columns already taken on the first line. When
/// `<addr>` does not fit after the name it moves to a folded line.
pub fn format_email_address(
    email_address: &EmailAddress,
    charset: &Charset,
    used: usize,
) -> Result<FormattedEmailAddress> {
    if !email_address.address.is_ascii() {
        return Err(Error::Encoding(format!(
            "Address must be ASCII: {}",
            email_address.address
        )));
    }

    let name = match email_address.display_name() {
        None => return Ok(FormattedEmailAddress(email_address.address.clone())),
        Some(name) if !needs_encoding(name) => quote_display_name(name),
        Some(name) => encode_words(name, charset, used)?.join(FOLD),
    };

    let angle = format!("<{}>", email_address.address);
    let column = last_line_end(&name, used);

    let separator = if column + 1 + angle.len() > MAX_LINE_LEN {
        FOLD
    } else {
        " "
    };

    Ok(FormattedEmailAddress(format!("{}{}{}", name, separator, angle)))
}

/// Join formatted addresses for a `From`, `To` or `Cc` header
///
/// Addresses are separated by `,` and folded onto a new line when the next
/// one would not fit on the current line.
pub fn format_recipient_header(
    header_name: &str,
    addresses: &[MimeEmailAddress],
) -> Result<String> {
    let mut header = String::new();
    let mut column = header_name.len() + 2;

    for (i, address) in addresses.iter().enumerate() {
        if i > 0 {
            header.push(',');
            column += 1;
        }

        let mut formatted = address.format_at(column)?;
        if i > 0 && column + first_line_len(&formatted) > MAX_LINE_LEN {
            header.push_str(FOLD);
            column = 1;
            formatted = address.format_at(column)?;
        }

        column = last_line_end(&formatted, column);
        header.push_str(&formatted);
    }

    Ok(header)
}

fn first_line_len(text: &str) -> usize {
    text.find("\r\n").unwrap_or(text.len())
}

/// Column after `text` when it starts at column `start`
fn last_line_end(text: &str, start: usize) -> usize {
    match text.rfind("\r\n") {
        Some(pos) => text.len() - pos - 2,
        None => start + text.len(),
    }
}
