use super::{Entity, EntityKind, NaturalKey};
use crate::error::Result;
use crate::grammar::{email, EmailAttributes};
use crate::resolve::Resolver;
use crate::storage::RecordId;
use serde::{Deserialize, Serialize};

/// Canonical local part of an email address or credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserName {
    pub name: String,
}

impl Entity for UserName {
    type Input = str;
    type Attributes = String;

    const KIND: EntityKind = EntityKind::UserName;

    fn parse(input: &str) -> Result<String> {
        Ok(email::parse_user_name(input)?)
    }

    fn derive_key(name: &String) -> NaturalKey {
        NaturalKey::single(name.as_str())
    }

    fn build(_resolver: &Resolver, name: String) -> Result<Self> {
        Ok(Self { name })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.name.as_str())
    }
}

/// Canonical host name, lower-cased
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostName {
    pub name: String,
}

impl Entity for HostName {
    type Input = str;
    type Attributes = String;

    const KIND: EntityKind = EntityKind::HostName;

    fn parse(input: &str) -> Result<String> {
        Ok(email::parse_host_name(input)?)
    }

    fn derive_key(name: &String) -> NaturalKey {
        NaturalKey::single(name.as_str())
    }

    fn build(_resolver: &Resolver, name: String) -> Result<Self> {
        Ok(Self { name })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.name.as_str())
    }
}

/// Canonical email address, composed of a user name and a host name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub address: String,
    pub user_name_id: RecordId,
    pub host_name_id: RecordId,
}

impl Entity for EmailAddress {
    type Input = str;
    type Attributes = EmailAttributes;

    const KIND: EntityKind = EntityKind::EmailAddress;

    fn parse(input: &str) -> Result<EmailAttributes> {
        Ok(email::parse(input)?)
    }

    fn derive_key(attributes: &EmailAttributes) -> NaturalKey {
        NaturalKey::single(attributes.address())
    }

    fn build(resolver: &Resolver, attributes: EmailAttributes) -> Result<Self> {
        let address = attributes.address();
        let user = resolver.find_or_import_attributes::<UserName>(attributes.user)?;
        let host = resolver.find_or_import_attributes::<HostName>(attributes.host)?;

        Ok(Self {
            address,
            user_name_id: user.id,
            host_name_id: host.id,
        })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.address.as_str())
    }

    fn secondary_keys(&self) -> Vec<(&'static str, NaturalKey)> {
        vec![(
            "user_host",
            NaturalKey::from_parts(vec![
                Some(self.user_name_id.to_string()),
                Some(self.host_name_id.to_string()),
            ]),
        )]
    }
}
