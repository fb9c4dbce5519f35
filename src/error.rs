//! Errors reported while turning domain names into tree keys.

use thiserror::Error;

use crate::key::MAX_NAME_LEN;
use crate::name::MAX_LABEL_LEN;

/// Reasons a presentation-form or wire-form domain name is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("domain name exceeds {MAX_NAME_LEN} octets")]
    NameTooLong,
    #[error("label exceeds {MAX_LABEL_LEN} octets")]
    LabelTooLong,
    #[error("empty label")]
    EmptyLabel,
    #[error("compression pointer in place of a literal label")]
    CompressionPointer,
    #[error("wire-format name ends before the root label")]
    Truncated,
    #[error("dangling escape at end of name")]
    BadEscape,
}
