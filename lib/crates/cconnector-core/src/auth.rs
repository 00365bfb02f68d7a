//! Authentication gate decision.
//!
//! Transport-agnostic: the HTTP layer extracts the presented credential and
//! supplies a freshly read [`CredentialRecord`].

use subtle::ConstantTimeEq;

use crate::credentials::CredentialRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Allow iff the record has a host token and `presented` equals it.
///
/// The comparison runs in constant time for equal-length inputs.
#[must_use]
pub fn authorize(presented: &str, record: &CredentialRecord) -> Decision {
    let expected = record.host_token.as_bytes();
    if expected.is_empty() {
        return Decision::Deny;
    }
    if bool::from(presented.as_bytes().ct_eq(expected)) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
