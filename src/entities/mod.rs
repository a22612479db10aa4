//! Canonical entity types and their key derivation
//!
//! Every entity implements [`Entity`]: how to parse its raw input, how to
//! derive the natural key that makes it unique, and how to build the stored
//! record (resolving any sub-records through the [`Resolver`]).
//!
//! | kind            | natural key                                           |
//! |-----------------|-------------------------------------------------------|
//! | `person_name`   | full text                                             |
//! | `phone_number`  | normalized text                                       |
//! | `user_name`     | name                                                  |
//! | `host_name`     | lower-cased name                                      |
//! | `email_address` | `user@host` (and unique user/host pair)               |
//! | `password`      | plain text                                            |
//! | `credential`    | `user:password` (and unique user/password pair)       |
//! | `advisory`      | full id                                               |
//! | `cert_name`     | name text                                             |
//! | `cert_subject`  | (CN, O, OU, L, ST, C)                                 |
//! | `cert_issuer`   | (CN, O, OU, L, ST, C)                                 |
//! | `certificate`   | fingerprint                                           |
//! | `asn`           | (range start, range end)                              |

mod advisory;
mod asn;
mod cert;
mod certificate;
mod credential;
mod email;
mod person;
mod phone;

pub use advisory::Advisory;
pub use asn::AsnRecord;
pub use cert::{CertIssuer, CertName, CertSubject, DnSource};
pub use certificate::{Certificate, CertificateAttributes, CertificateInput};
pub use credential::{Credential, Password};
pub use email::{EmailAddress, HostName, UserName};
pub use person::PersonName;
pub use phone::PhoneNumber;

use crate::config::MutableFieldPolicy;
use crate::error::{CanonError, Result};
use crate::range::IpRange;
use crate::resolve::Resolver;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Entity-type tag used by the store and the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    PersonName,
    PhoneNumber,
    UserName,
    HostName,
    EmailAddress,
    Password,
    Credential,
    Advisory,
    CertName,
    CertSubject,
    CertIssuer,
    Certificate,
    Asn,
}

impl EntityKind {
    pub const ALL: [EntityKind; 13] = [
        EntityKind::PersonName,
        EntityKind::PhoneNumber,
        EntityKind::UserName,
        EntityKind::HostName,
        EntityKind::EmailAddress,
        EntityKind::Password,
        EntityKind::Credential,
        EntityKind::Advisory,
        EntityKind::CertName,
        EntityKind::CertSubject,
        EntityKind::CertIssuer,
        EntityKind::Certificate,
        EntityKind::Asn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::PersonName => "person_name",
            EntityKind::PhoneNumber => "phone_number",
            EntityKind::UserName => "user_name",
            EntityKind::HostName => "host_name",
            EntityKind::EmailAddress => "email_address",
            EntityKind::Password => "password",
            EntityKind::Credential => "credential",
            EntityKind::Advisory => "advisory",
            EntityKind::CertName => "cert_name",
            EntityKind::CertSubject => "cert_subject",
            EntityKind::CertIssuer => "cert_issuer",
            EntityKind::Certificate => "certificate",
            EntityKind::Asn => "asn",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CanonError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| CanonError::UnknownEntityKind(s.to_string()))
    }
}

/// The attribute tuple that uniquely identifies an entity of one kind
///
/// Absent components are kept as `None` so `(None, "Acme")` and
/// `("", "Acme")` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(Vec<Option<String>>);

impl NaturalKey {
    /// Single-attribute key
    pub fn single(value: impl Into<String>) -> Self {
        Self(vec![Some(value.into())])
    }

    /// Composite key
    pub fn from_parts(parts: Vec<Option<String>>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[Option<String>] {
        &self.0
    }

    /// Stable text encoding used as the stored key (a JSON array)
    pub fn encode(&self) -> String {
        serde_json::Value::from(self.0.clone()).to_string()
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Raw input an entity can be resolved from when only text is at hand
pub trait RawInput: ToOwned {
    fn from_raw(raw: &str) -> Result<Cow<'_, Self>>;
}

impl RawInput for str {
    fn from_raw(raw: &str) -> Result<Cow<'_, Self>> {
        Ok(Cow::Borrowed(raw))
    }
}

/// Capability every canonical entity type provides to the resolver
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// What callers hand in (usually `str`)
    type Input: RawInput + ?Sized;

    /// Parser output, before sub-records are resolved
    type Attributes: Serialize;

    const KIND: EntityKind;

    /// Run the grammar parser
    fn parse(input: &Self::Input) -> Result<Self::Attributes>;

    /// Natural key of a parsed attribute set
    fn derive_key(attributes: &Self::Attributes) -> NaturalKey;

    /// Natural key straight from raw input
    ///
    /// Entities whose key is the trimmed input override this to skip parsing.
    fn lookup_key(input: &Self::Input) -> Result<NaturalKey> {
        Ok(Self::derive_key(&Self::parse(input)?))
    }

    /// Post-parse checks that must pass before anything is persisted
    fn validate(_attributes: &Self::Attributes) -> Result<()> {
        Ok(())
    }

    /// Build the record, resolving sub-records as needed
    fn build(resolver: &Resolver, attributes: Self::Attributes) -> Result<Self>;

    /// Natural key of a built record; equals `derive_key` of its attributes
    fn natural_key(&self) -> NaturalKey;

    /// Additional unique keys, named
    fn secondary_keys(&self) -> Vec<(&'static str, NaturalKey)> {
        Vec::new()
    }

    /// Address range for containment queries
    fn ip_range(&self) -> Option<IpRange> {
        None
    }

    /// Merge mutable descriptive fields from a later import
    ///
    /// Returns whether anything changed.
    fn refresh(&mut self, _incoming: &Self::Attributes, _policy: MutableFieldPolicy) -> bool {
        false
    }
}

/// Require a field that parsing may leave absent
pub(crate) fn require(
    entity: &'static str,
    field: &'static str,
    value: &Option<String>,
) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(CanonError::MissingRequiredField { entity, field }),
    }
}
