use super::{require, Entity, EntityKind, NaturalKey, RawInput};
use crate::error::{CanonError, FormatError, Result};
use crate::grammar::{dn, DistinguishedNameAttributes};
use crate::resolve::Resolver;
use crate::storage::RecordId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A distinguished name as it arrives: serialized text or an RDN list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DnSource {
    Text(String),
    Rdns(Vec<(String, String)>),
}

impl DnSource {
    pub fn parse(&self) -> std::result::Result<DistinguishedNameAttributes, FormatError> {
        match self {
            DnSource::Text(text) => dn::parse_str(text),
            DnSource::Rdns(rdns) => dn::parse_rdns(rdns.as_slice()),
        }
    }
}

impl From<&str> for DnSource {
    fn from(text: &str) -> Self {
        DnSource::Text(text.to_string())
    }
}

impl RawInput for DnSource {
    fn from_raw(raw: &str) -> Result<Cow<'_, Self>> {
        Ok(Cow::Owned(DnSource::from(raw)))
    }
}

/// Name text referenced by subjects and alternative names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertName {
    pub name: String,
}

impl Entity for CertName {
    type Input = str;
    type Attributes = String;

    const KIND: EntityKind = EntityKind::CertName;

    fn parse(input: &str) -> Result<String> {
        let name = input.trim();
        if name.is_empty() {
            return Err(CanonError::MissingRequiredField {
                entity: "cert_name",
                field: "name",
            });
        }
        Ok(name.to_string())
    }

    fn derive_key(name: &String) -> NaturalKey {
        NaturalKey::single(name.as_str())
    }

    fn lookup_key(input: &str) -> Result<NaturalKey> {
        Ok(NaturalKey::single(input.trim()))
    }

    fn build(_resolver: &Resolver, name: String) -> Result<Self> {
        Ok(Self { name })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.name.as_str())
    }
}

/// `(CN, O, OU, L, ST, C)`, shared by subjects and issuers
fn dn_key(
    common_name: &Option<String>,
    organization: &Option<String>,
    organizational_unit: &Option<String>,
    locality: &Option<String>,
    state: &Option<String>,
    country: &Option<String>,
) -> NaturalKey {
    NaturalKey::from_parts(vec![
        common_name.clone(),
        organization.clone(),
        organizational_unit.clone(),
        locality.clone(),
        state.clone(),
        country.clone(),
    ])
}

fn dn_attributes_key(attrs: &DistinguishedNameAttributes) -> NaturalKey {
    dn_key(
        &attrs.common_name,
        &attrs.organization,
        &attrs.organizational_unit,
        &attrs.locality,
        &attrs.state,
        &attrs.country,
    )
}

fn validate_dn(entity: &'static str, attrs: &DistinguishedNameAttributes) -> Result<()> {
    require(entity, "organization", &attrs.organization)?;
    require(entity, "country", &attrs.country)?;
    Ok(())
}

/// Certificate subject
///
/// The common name is resolved to a [`CertName`] so that the same name seen
/// as a subject and as an alternative name links to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertSubject {
    pub common_name: Option<String>,
    pub common_name_id: Option<RecordId>,
    pub email: Option<String>,
    pub organization: String,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: String,
}

impl Entity for CertSubject {
    type Input = DnSource;
    type Attributes = DistinguishedNameAttributes;

    const KIND: EntityKind = EntityKind::CertSubject;

    fn parse(input: &DnSource) -> Result<DistinguishedNameAttributes> {
        Ok(input.parse()?)
    }

    fn derive_key(attributes: &DistinguishedNameAttributes) -> NaturalKey {
        dn_attributes_key(attributes)
    }

    fn validate(attributes: &DistinguishedNameAttributes) -> Result<()> {
        validate_dn("cert_subject", attributes)
    }

    fn build(resolver: &Resolver, attributes: DistinguishedNameAttributes) -> Result<Self> {
        let organization = require("cert_subject", "organization", &attributes.organization)?;
        let country = require("cert_subject", "country", &attributes.country)?;
        let common_name_id = match &attributes.common_name {
            Some(name) => Some(
                resolver
                    .find_or_import_attributes::<CertName>(name.clone())?
                    .id,
            ),
            None => None,
        };

        Ok(Self {
            common_name: attributes.common_name,
            common_name_id,
            email: attributes.email,
            organization,
            organizational_unit: attributes.organizational_unit,
            locality: attributes.locality,
            state: attributes.state,
            country,
        })
    }

    fn natural_key(&self) -> NaturalKey {
        dn_key(
            &self.common_name,
            &Some(self.organization.clone()),
            &self.organizational_unit,
            &self.locality,
            &self.state,
            &Some(self.country.clone()),
        )
    }
}

/// Certificate issuer; same shape as a subject without the name reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertIssuer {
    pub common_name: Option<String>,
    pub email: Option<String>,
    pub organization: String,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: String,
}

impl Entity for CertIssuer {
    type Input = DnSource;
    type Attributes = DistinguishedNameAttributes;

    const KIND: EntityKind = EntityKind::CertIssuer;

    fn parse(input: &DnSource) -> Result<DistinguishedNameAttributes> {
        Ok(input.parse()?)
    }

    fn derive_key(attributes: &DistinguishedNameAttributes) -> NaturalKey {
        dn_attributes_key(attributes)
    }

    fn validate(attributes: &DistinguishedNameAttributes) -> Result<()> {
        validate_dn("cert_issuer", attributes)
    }

    fn build(_resolver: &Resolver, attributes: DistinguishedNameAttributes) -> Result<Self> {
        Ok(Self {
            organization: require("cert_issuer", "organization", &attributes.organization)?,
            country: require("cert_issuer", "country", &attributes.country)?,
            common_name: attributes.common_name,
            email: attributes.email,
            organizational_unit: attributes.organizational_unit,
            locality: attributes.locality,
            state: attributes.state,
        })
    }

    fn natural_key(&self) -> NaturalKey {
        dn_key(
            &self.common_name,
            &Some(self.organization.clone()),
            &self.organizational_unit,
            &self.locality,
            &self.state,
            &Some(self.country.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_rdn_sources_share_a_key() {
        let text = DnSource::from("CN=www.example.com,O=Example Inc,C=US");
        let rdns = DnSource::Rdns(vec![
            ("C".to_string(), "US".to_string()),
            ("O".to_string(), "Example Inc".to_string()),
            ("CN".to_string(), "www.example.com".to_string()),
        ]);

        assert_eq!(
            CertSubject::lookup_key(&text).unwrap(),
            CertSubject::lookup_key(&rdns).unwrap()
        );
    }

    #[test]
    fn test_dn_source_json_forms() {
        let text: DnSource = serde_json::from_str(r#""/C=US/O=Acme""#).unwrap();
        assert_eq!(text, DnSource::from("/C=US/O=Acme"));

        let rdns: DnSource = serde_json::from_str(r#"[["O","Acme"],["C","US"]]"#).unwrap();
        assert!(matches!(rdns, DnSource::Rdns(ref pairs) if pairs.len() == 2));
    }

    #[test]
    fn test_organization_and_country_required() {
        let no_org = CertSubject::parse(&DnSource::from("CN=host,C=US")).unwrap();
        assert!(matches!(
            CertSubject::validate(&no_org),
            Err(CanonError::MissingRequiredField {
                entity: "cert_subject",
                field: "organization"
            })
        ));

        let no_country = CertIssuer::parse(&DnSource::from("O=Acme")).unwrap();
        assert!(matches!(
            CertIssuer::validate(&no_country),
            Err(CanonError::MissingRequiredField {
                entity: "cert_issuer",
                field: "country"
            })
        ));
    }
}
