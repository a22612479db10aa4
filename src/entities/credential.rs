use super::{Entity, EntityKind, NaturalKey, UserName};
use crate::error::Result;
use crate::grammar::{credential, CredentialAttributes};
use crate::resolve::Resolver;
use crate::storage::RecordId;
use serde::{Deserialize, Serialize};

/// Canonical plain-text password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Password {
    pub plain_text: String,
}

impl Entity for Password {
    type Input = str;
    type Attributes = String;

    const KIND: EntityKind = EntityKind::Password;

    // Surrounding whitespace is part of a password
    fn parse(input: &str) -> Result<String> {
        Ok(credential::parse_password(input)?)
    }

    fn derive_key(plain_text: &String) -> NaturalKey {
        NaturalKey::single(plain_text.as_str())
    }

    fn build(_resolver: &Resolver, plain_text: String) -> Result<Self> {
        Ok(Self { plain_text })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.plain_text.as_str())
    }
}

/// Canonical `user:password` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub text: String,
    pub user_name_id: RecordId,
    pub password_id: RecordId,
}

impl Entity for Credential {
    type Input = str;
    type Attributes = CredentialAttributes;

    const KIND: EntityKind = EntityKind::Credential;

    fn parse(input: &str) -> Result<CredentialAttributes> {
        Ok(credential::parse(input)?)
    }

    fn derive_key(attributes: &CredentialAttributes) -> NaturalKey {
        NaturalKey::single(attributes.text())
    }

    fn build(resolver: &Resolver, attributes: CredentialAttributes) -> Result<Self> {
        let text = attributes.text();
        let user = resolver.find_or_import_attributes::<UserName>(attributes.user)?;
        let password = resolver.find_or_import_attributes::<Password>(attributes.password)?;

        Ok(Self {
            text,
            user_name_id: user.id,
            password_id: password.id,
        })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::single(self.text.as_str())
    }

    fn secondary_keys(&self) -> Vec<(&'static str, NaturalKey)> {
        vec![(
            "user_password",
            NaturalKey::from_parts(vec![
                Some(self.user_name_id.to_string()),
                Some(self.password_id.to_string()),
            ]),
        )]
    }
}
