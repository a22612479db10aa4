//! Grammar parsers for reconnaissance identifiers
//!
//! Each parser is a pure function from raw text to an attribute struct or a
//! [`FormatError`](crate::error::FormatError). None of them touch storage.
//!
//! - Personal names (`Dr. John Q. Smith, Jr.`)
//! - Phone numbers in hyphen, period, space and parenthetical families
//! - Email addresses, user names and host names
//! - `user:password` credentials
//! - Advisory identifiers (CVE, MS, RHSA, GHSA)
//! - Certificate distinguished names and subject-alternative-name lists
//! - iptoasn-style ASN range lines

pub mod advisory;
pub mod asn;
pub mod credential;
pub mod dn;
pub mod email;
pub mod person_name;
pub mod phone;
pub mod san;

pub use advisory::{AdvisoryAttributes, AdvisoryPrefix};
pub use asn::AsnAttributes;
pub use credential::CredentialAttributes;
pub use dn::DistinguishedNameAttributes;
pub use email::EmailAttributes;
pub use person_name::PersonNameAttributes;
pub use phone::PhoneNumberAttributes;
pub use san::SubjectAltName;

use regex::Regex;

/// Compile a built-in pattern
///
/// Only used for the constant patterns in this module tree; a failure here is
/// a defect in the pattern literal itself.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("built-in pattern {pattern:?} is invalid: {e}"))
}
