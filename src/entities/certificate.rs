use super::{CertIssuer, CertName, CertSubject, DnSource, Entity, EntityKind, NaturalKey, RawInput};
use crate::error::{CanonError, FormatError, Result};
use crate::grammar::{san, DistinguishedNameAttributes, SubjectAltName};
use crate::resolve::Resolver;
use crate::storage::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A certificate as reported by a scanner
///
/// Raw text input is the JSON encoding of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInput {
    pub fingerprint: String,
    pub serial: String,
    pub subject: DnSource,
    #[serde(default)]
    pub issuer: Option<DnSource>,
    #[serde(default)]
    pub subject_alt_names: Option<String>,
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,
}

impl RawInput for CertificateInput {
    fn from_raw(raw: &str) -> Result<Cow<'_, Self>> {
        let input: CertificateInput = serde_json::from_str(raw).map_err(|e| {
            CanonError::from(FormatError::InvalidInput {
                entity: "certificate",
                message: e.to_string(),
            })
        })?;
        Ok(Cow::Owned(input))
    }
}

/// Parsed certificate, before subject, issuer and names are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateAttributes {
    /// Lower-case hex without separators
    pub fingerprint: String,
    pub serial: String,
    pub subject: DistinguishedNameAttributes,
    /// `None` when self-signed
    pub issuer: Option<DistinguishedNameAttributes>,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

impl CertificateAttributes {
    pub fn is_self_signed(&self) -> bool {
        self.issuer.is_none()
    }
}

/// Canonical certificate record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub fingerprint: String,
    pub serial: String,
    pub subject_id: RecordId,
    pub issuer_id: Option<RecordId>,
    pub alt_name_ids: Vec<RecordId>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

fn normalize_fingerprint(text: &str) -> std::result::Result<String, FormatError> {
    let hex: String = text
        .trim()
        .chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FormatError::InvalidInput {
            entity: "certificate",
            message: format!("fingerprint must be hex, got {text:?}"),
        });
    }
    Ok(hex)
}

impl Entity for Certificate {
    type Input = CertificateInput;
    type Attributes = CertificateAttributes;

    const KIND: EntityKind = EntityKind::Certificate;

    fn parse(input: &CertificateInput) -> Result<CertificateAttributes> {
        let subject = input.subject.parse()?;
        let issuer = match &input.issuer {
            Some(issuer) => Some(issuer.parse()?).filter(|issuer| *issuer != subject),
            None => None,
        };
        let subject_alt_names = match &input.subject_alt_names {
            Some(text) => san::parse(text)?,
            None => Vec::new(),
        };

        Ok(CertificateAttributes {
            fingerprint: normalize_fingerprint(&input.fingerprint)?,
            serial: input.serial.trim().to_string(),
            subject,
            issuer,
            subject_alt_names,
            not_before: input.not_before,
            not_after: input.not_after,
        })
    }

    fn derive_key(attributes: &CertificateAttributes) -> NaturalKey {
        NaturalKey::single(attributes.fingerprint.as_str())
    }

    fn lookup_key(input: &CertificateInput) -> Result<NaturalKey> {
        Ok(NaturalKey::single(normalize_fingerprint(&input.fingerprint)?))
    }

    fn validate(attributes: &CertificateAttributes) -> Result<()> {
        if attributes.serial.is_empty() {
            return Err(CanonError::MissingRequiredField {
                entity: "certificate",
                field: "serial",
            });
        }
        if let (Some(not_before), Some(not_after)) = (attributes.not_before, attributes.not_after) {
            if not_before > not_after {
                return Err(CanonError::InvalidField {
                    entity: "certificate",
                    field: "not_before",
                    message: format!("{not_before} is after {not_after}"),
                });
            }
        }

        CertSubject::validate(&attributes.subject)?;
        if let Some(issuer) = &attributes.issuer {
            CertIssuer::validate(issuer)?;
        }
        Ok(())
    }

    fn build(resolver: &Resolver, attributes: CertificateAttributes) -> Result<Self> {
        let subject = resolver.find_or_import_attributes::<CertSubject>(attributes.subject)?;
        let issuer_id = match attributes.issuer {
            Some(issuer) => Some(resolver.find_or_import_attributes::<CertIssuer>(issuer)?.id),
            None => None,
        };

        let mut alt_name_ids = Vec::with_capacity(attributes.subject_alt_names.len());
        for alt_name in &attributes.subject_alt_names {
            let id = resolver
                .find_or_import_attributes::<CertName>(alt_name.value())?
                .id;
            if !alt_name_ids.contains(&id) {
                alt_name_ids.push(id);
            }
        }

        Ok(Self {
            fingerprint: attributes.fingerprint,
            serial: attributes.serial,
            subject_id: subject.id,
            issuer_id,
            alt_name_ids,
            not_before: attributes.not_before,
            not_after: attributes.not_after,
        })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.fingerprint.as_str())
    }
}
