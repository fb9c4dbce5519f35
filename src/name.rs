//! Presentation-form domain names.
//!
//! [`WireName`] holds the uncompressed wire rendition of a name: a run of
//! length-prefixed labels closed by the zero-length root label. It exists so
//! zone data written as text (`"www.example.org"`, escapes included) can be
//! fed to the key transform; names arriving in packets are already wire form.

use crate::error::NameError;
use crate::key::MAX_NAME_LEN;

/// Labels are limited to 63 octets; longer length values are pointer tags.
pub const MAX_LABEL_LEN: usize = 63;

/// An uncompressed wire-format domain name.
///
/// # Example
///
/// ```rust
/// use nametree::WireName;
///
/// let name = WireName::from_text("www.example.org").unwrap();
/// assert_eq!(name.as_slice(), b"\x03www\x07example\x03org\x00");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireName {
    len: u8,
    octets: [u8; MAX_NAME_LEN],
}

impl WireName {
    /// Parses a presentation-form name.
    ///
    /// Both `"."` and the empty string denote the root. Backslash escapes are
    /// honored (RFC 1035 section 5.1): `\DDD` with three decimal digits
    /// yields that octet, any other escaped character is taken literally, so
    /// `r"a\.b"` is one three-octet label.
    pub fn from_text(name: &str) -> Result<Self, NameError> {
        let mut octets = [0u8; MAX_NAME_LEN];
        if name.is_empty() || name == "." {
            return Ok(WireName { len: 1, octets });
        }

        let text = name.as_bytes();
        let mut head = 0usize; // position of the open label's length octet
        let mut pos = 1usize; // next content octet
        let mut idx = 0usize;

        while idx < text.len() {
            match text[idx] {
                b'.' => {
                    close_label(&mut octets, head, pos)?;
                    head = pos;
                    pos += 1;
                    idx += 1;
                }
                b'\\' => {
                    let (octet, consumed) = unescape(&text[idx..])?;
                    push_octet(&mut octets, &mut pos, octet)?;
                    idx += consumed;
                }
                octet => {
                    push_octet(&mut octets, &mut pos, octet)?;
                    idx += 1;
                }
            }
        }

        // A name without a trailing dot still closes its last label.
        if pos != head + 1 {
            close_label(&mut octets, head, pos)?;
            head = pos;
        }

        if head >= MAX_NAME_LEN {
            return Err(NameError::NameTooLong);
        }
        octets[head] = 0;
        Ok(WireName {
            len: head as u8 + 1,
            octets,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.octets[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        // The root label is always present.
        false
    }
}

fn close_label(octets: &mut [u8], head: usize, pos: usize) -> Result<(), NameError> {
    let len = pos - head - 1;
    if len == 0 {
        return Err(NameError::EmptyLabel);
    }
    if len > MAX_LABEL_LEN {
        return Err(NameError::LabelTooLong);
    }
    octets[head] = len as u8;
    Ok(())
}

fn push_octet(octets: &mut [u8], pos: &mut usize, octet: u8) -> Result<(), NameError> {
    if *pos >= MAX_NAME_LEN {
        return Err(NameError::NameTooLong);
    }
    octets[*pos] = octet;
    *pos += 1;
    Ok(())
}

/// Decodes one escape sequence starting at the backslash; returns the octet
/// and the number of input bytes consumed.
fn unescape(text: &[u8]) -> Result<(u8, usize), NameError> {
    debug_assert_eq!(text[0], b'\\');
    if text.len() >= 4 && text[1..4].iter().all(u8::is_ascii_digit) {
        let value = (text[1] - b'0') as u16 * 100 + (text[2] - b'0') as u16 * 10 + (text[3] - b'0') as u16;
        if value <= 255 {
            return Ok((value as u8, 4));
        }
        // Out-of-range \DDD degrades to a literal escape of the first digit.
        return Ok((text[1], 2));
    }
    match text.get(1) {
        Some(&octet) => Ok((octet, 2)),
        None => Err(NameError::BadEscape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_round_into_wire_form() {
        let name = WireName::from_text("f.isi.arpa").unwrap();
        assert_eq!(name.as_slice(), b"\x01f\x03isi\x04arpa\x00");
        // A trailing dot changes nothing.
        let dotted = WireName::from_text("f.isi.arpa.").unwrap();
        assert_eq!(dotted.as_slice(), name.as_slice());
    }

    #[test]
    fn root_spellings() {
        assert_eq!(WireName::from_text(".").unwrap().as_slice(), b"\x00");
        assert_eq!(WireName::from_text("").unwrap().as_slice(), b"\x00");
    }

    #[test]
    fn decimal_escapes() {
        // \068 is 'D'; \000 is a raw zero octet inside a label.
        let name = WireName::from_text(r"\068\000x.y").unwrap();
        assert_eq!(name.as_slice(), b"\x03D\x00x\x01y\x00");
    }

    #[test]
    fn literal_escapes() {
        let name = WireName::from_text(r"a\.b.c").unwrap();
        assert_eq!(name.as_slice(), b"\x03a.b\x01c\x00");
        // Escaped digits short of three fall back to literal.
        let name = WireName::from_text(r"a\4b").unwrap();
        assert_eq!(name.as_slice(), b"\x03a4b\x00");
        // \DDD above 255 keeps the first digit literally.
        let name = WireName::from_text(r"a\999").unwrap();
        assert_eq!(name.as_slice(), b"\x04a999\x00");
    }

    #[test]
    fn malformed_names_are_rejected() {
        assert_eq!(WireName::from_text("a..b"), Err(NameError::EmptyLabel));
        assert_eq!(WireName::from_text(".b"), Err(NameError::EmptyLabel));
        assert_eq!(WireName::from_text(r"ab\"), Err(NameError::BadEscape));
        let long_label = "a".repeat(64);
        assert_eq!(
            WireName::from_text(&long_label),
            Err(NameError::LabelTooLong)
        );
        let long_name = ["a".repeat(63), "b".repeat(63), "c".repeat(63), "d".repeat(63)].join(".");
        assert_eq!(WireName::from_text(&long_name), Err(NameError::NameTooLong));
    }
}
