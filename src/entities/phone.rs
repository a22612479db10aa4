use super::{Entity, EntityKind, NaturalKey};
use crate::error::Result;
use crate::grammar::{phone, PhoneNumberAttributes};
use crate::resolve::Resolver;

/// Canonical phone number
pub type PhoneNumber = PhoneNumberAttributes;

impl Entity for PhoneNumberAttributes {
    type Input = str;
    type Attributes = PhoneNumberAttributes;

    const KIND: EntityKind = EntityKind::PhoneNumber;

    fn parse(input: &str) -> Result<Self::Attributes> {
        Ok(phone::parse(input)?)
    }

    fn derive_key(attributes: &Self::Attributes) -> NaturalKey {
        NaturalKey::single(attributes.normalized_text.as_str())
    }

    fn build(_resolver: &Resolver, attributes: Self::Attributes) -> Result<Self> {
        Ok(attributes)
    }

    fn natural_key(&self) -> NaturalKey {
        Self::derive_key(self)
    }
}
