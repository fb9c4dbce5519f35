//! Domain-name-to-sortkey transform.
//!
//! Radix-tree keys must never be prefixes of one another, and domain names
//! compare case-insensitively (RFC 1035 section 2.3.3), which leaves room to
//! re-encode names without a multi-byte scheme. [`Key::from_wire`] reverses
//! the label order so ancestors sort before descendants, folds uppercase
//! US-ASCII onto lowercase, and shifts every remaining octet into
//! `0x01..=0xe6`. `0x00` is then free to terminate each label and the key as
//! a whole, which keeps plain byte order equal to canonical DNS name order
//! (RFC 4034 section 6.1) and makes the terminator the reason no key can be
//! a prefix of another.
//!
//! Examples (digits are octet values, letters are ASCII):
//!
//! | name         | wire            | key           |
//! |--------------|-----------------|---------------|
//! | `.`          | `0`             | `0`           |
//! | `fOo.`       | `3fOo0`         | `MVV00`       |
//! | `bAr.foo.`   | `3bAr3foo0`     | `MVV0IHY00`   |
//! | `a.bar.fOo.` | `1a3bar3fOo0`   | `MVV0IHY0H00` |

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::error::NameError;
use crate::name::WireName;

/// Domain names, and therefore keys, are limited to 255 octets.
pub const MAX_NAME_LEN: usize = 255;

/// A tree key produced from a domain name.
///
/// Keys only come out of the transform, so every `Key` in circulation is
/// case-folded, hierarchy-ordered, and null-terminated.
///
/// # Example
///
/// ```rust
/// use nametree::Key;
///
/// let upper = Key::from_text("WWW.Example.ORG").unwrap();
/// let lower = Key::from_text("www.example.org").unwrap();
/// assert_eq!(upper, lower);
///
/// let parent = Key::from_text("example.org").unwrap();
/// assert!(parent < lower);
/// ```
#[derive(Clone)]
pub struct Key {
    len: u8,
    octets: [u8; MAX_NAME_LEN],
}

/// Re-encode one name octet.
///
/// Monotone over the case-folded octet space: `0x00..=0x40` shifts up by one,
/// `0x41..=0x5a` (A-Z) lands on the lowercase images, `0x5b..=0xff` shifts
/// down into `0x42..=0xe6`.
pub(crate) fn xlat(octet: u8) -> u8 {
    if octet < 0x41 {
        octet + 0x01
    } else if octet < 0x5b {
        octet + 0x07
    } else {
        octet - 0x19
    }
}

/// Length of the longest common prefix of `a` and `b`.
pub(crate) fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl Key {
    /// Builds the key for a wire-format name (length-prefixed labels ending
    /// in the zero-length root label).
    ///
    /// Labels are taken in standard wire order; the transform itself emits
    /// them root-side first.
    pub fn from_wire(name: &[u8]) -> Result<Self, NameError> {
        // (offset, len) per label; 127 single-octet labels is the wire maximum.
        let mut labels: SmallVec<[(u8, u8); 32]> = SmallVec::new();
        let mut pos = 0usize;

        loop {
            let len = *name.get(pos).ok_or(NameError::Truncated)?;
            if len == 0 {
                break;
            }
            if len & 0xc0 != 0 {
                return Err(NameError::CompressionPointer);
            }
            if pos + 1 + len as usize >= MAX_NAME_LEN {
                return Err(NameError::NameTooLong);
            }
            labels.push((pos as u8 + 1, len));
            pos += 1 + len as usize;
        }

        // The key is exactly as long as the wire name: one separator per
        // label replaces its length octet, and the terminator replaces the
        // root label.
        let mut octets = [0u8; MAX_NAME_LEN];
        let mut out = 0usize;
        for &(start, len) in labels.iter().rev() {
            let label = &name[start as usize..start as usize + len as usize];
            for &octet in label {
                octets[out] = xlat(octet);
                out += 1;
            }
            octets[out] = 0x00;
            out += 1;
        }
        octets[out] = 0x00;
        out += 1;

        Ok(Key {
            len: out as u8,
            octets,
        })
    }

    /// Builds the key for a presentation-form name such as `"www.example.org"`.
    pub fn from_text(name: &str) -> Result<Self, NameError> {
        Self::from_wire(WireName::from_text(name)?.as_slice())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.octets[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        // The shortest key is the root key, one terminator octet.
        false
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.as_slice()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_key_is_a_single_terminator() {
        let key = Key::from_wire(&[0]).unwrap();
        assert_eq!(key.as_slice(), b"\x00");
    }

    #[test]
    fn documented_example_family() {
        let cases: [(&str, &[u8]); 5] = [
            ("foo.", b"MVV\x00\x00"),
            ("bar.foo.", b"MVV\x00IHY\x00\x00"),
            ("a.bar.foo.", b"MVV\x00IHY\x00H\x00\x00"),
            ("ab.bar.foo.", b"MVV\x00IHY\x00HI\x00\x00"),
            ("b.bar.foo.", b"MVV\x00IHY\x00I\x00\x00"),
        ];
        for (name, expected) in cases {
            assert_eq!(Key::from_text(name).unwrap().as_slice(), expected, "{name}");
        }
    }

    #[test]
    fn case_variants_share_a_key() {
        let names = ["foo.bar.", "FOO.BAR.", "fOo.BaR.", "Foo.baR."];
        let reference = Key::from_text(names[0]).unwrap();
        for name in names {
            assert_eq!(Key::from_text(name).unwrap(), reference, "{name}");
        }
    }

    #[test]
    fn zero_appears_only_as_separator_and_terminator() {
        // \000 is a legal label octet; xlat must lift it off zero.
        let key = Key::from_text(r"a\000b.example.").unwrap();
        let octets = key.as_slice();
        let zeros: Vec<usize> = octets
            .iter()
            .enumerate()
            .filter_map(|(idx, &oct)| (oct == 0).then_some(idx))
            .collect();
        // One separator per label plus the final two terminating octets.
        assert_eq!(zeros.len(), 3);
        assert_eq!(octets[octets.len() - 1], 0);
        assert_eq!(octets[octets.len() - 2], 0);
    }

    #[test]
    fn compression_pointer_is_rejected() {
        assert_eq!(
            Key::from_wire(&[0xc0, 0x04, 0x00]),
            Err(NameError::CompressionPointer)
        );
    }

    #[test]
    fn truncated_wire_is_rejected() {
        assert_eq!(Key::from_wire(&[3, b'f', b'o']), Err(NameError::Truncated));
        assert_eq!(Key::from_wire(&[]), Err(NameError::Truncated));
    }

    #[test]
    fn oversized_wire_is_rejected() {
        let mut wire = Vec::new();
        for _ in 0..5 {
            wire.push(63);
            wire.extend(std::iter::repeat(b'a').take(63));
        }
        wire.push(0);
        assert_eq!(Key::from_wire(&wire), Err(NameError::NameTooLong));
    }

    #[test]
    fn xlat_is_monotone_over_folded_octets() {
        // After case folding no octet remains in 0x41..=0x5a.
        let folded: Vec<u8> = (0u8..=255)
            .filter(|oct| !(0x41..=0x5a).contains(oct))
            .collect();
        for pair in folded.windows(2) {
            assert!(xlat(pair[0]) < xlat(pair[1]), "{:#x} {:#x}", pair[0], pair[1]);
        }
        assert!(folded.iter().all(|&oct| xlat(oct) >= 0x01 && xlat(oct) <= 0xe6));
    }

    /// Canonical DNS order (RFC 4034 section 6.1): compare label sequences
    /// right to left, octet-wise and case-insensitively, ancestors first.
    fn canonical_cmp(a: &str, b: &str) -> Ordering {
        fn labels(name: &str) -> Vec<Vec<u8>> {
            name.trim_end_matches('.')
                .split('.')
                .filter(|label| !label.is_empty())
                .rev()
                .map(|label| label.bytes().map(|oct| oct.to_ascii_lowercase()).collect())
                .collect()
        }
        let (a, b) = (labels(a), labels(b));
        for (la, lb) in a.iter().zip(&b) {
            match la.cmp(lb) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    }

    #[test]
    fn key_order_equals_canonical_name_order() {
        let names = [
            ".",
            "example.",
            "EXAMPLE.",
            "a.example.",
            "yljkjljk.a.example.",
            "Z.a.example.",
            "zABC.a.EXAMPLE.",
            "z.example.",
            "-.z.example.",
            "0.z.example.",
            "zz.",
            "aaa.zz.",
        ];
        for a in names {
            for b in names {
                assert_eq!(
                    canonical_cmp(a, b),
                    Key::from_text(a).unwrap().cmp(&Key::from_text(b).unwrap()),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn distinct_names_yield_distinct_keys() {
        let names = ["example.", "examples.", "exampl.", "e.xample.", "example.e."];
        let keys: Vec<Key> = names.iter().map(|n| Key::from_text(n).unwrap()).collect();
        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                assert_eq!(i == j, a == b, "{} vs {}", names[i], names[j]);
            }
        }
    }

    #[test]
    fn no_key_is_a_prefix_of_another() {
        let names = ["example.", "www.example.", "w.example.", "wwww.example.", "example.w."];
        let keys: Vec<Key> = names.iter().map(|n| Key::from_text(n).unwrap()).collect();
        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i != j {
                    assert!(!b.as_slice().starts_with(a.as_slice()), "{i} prefixes {j}");
                }
            }
        }
    }
}
