use super::{Entity, EntityKind, NaturalKey};
use crate::error::Result;
use crate::grammar::{advisory, AdvisoryAttributes};
use crate::resolve::Resolver;

/// Canonical advisory identifier
pub type Advisory = AdvisoryAttributes;

impl Entity for AdvisoryAttributes {
    type Input = str;
    type Attributes = AdvisoryAttributes;

    const KIND: EntityKind = EntityKind::Advisory;

    fn parse(input: &str) -> Result<Self::Attributes> {
        Ok(advisory::parse(input)?)
    }

    fn derive_key(attributes: &Self::Attributes) -> NaturalKey {
        NaturalKey::single(attributes.full_id.as_str())
    }

    fn build(_resolver: &Resolver, attributes: Self::Attributes) -> Result<Self> {
        Ok(attributes)
    }

    fn natural_key(&self) -> NaturalKey {
        Self::derive_key(self)
    }
}
