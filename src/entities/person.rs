use super::{Entity, EntityKind, NaturalKey};
use crate::error::{CanonError, Result};
use crate::grammar::{person_name, PersonNameAttributes};
use crate::resolve::Resolver;

/// Canonical personal name; the record is the parsed attribute set itself
pub type PersonName = PersonNameAttributes;

impl Entity for PersonNameAttributes {
    type Input = str;
    type Attributes = PersonNameAttributes;

    const KIND: EntityKind = EntityKind::PersonName;

    fn parse(input: &str) -> Result<Self::Attributes> {
        Ok(person_name::parse(input)?)
    }

    fn derive_key(attributes: &Self::Attributes) -> NaturalKey {
        NaturalKey::single(attributes.full_text.as_str())
    }

    // full_text is the trimmed input, so a lookup never runs the grammar
    fn lookup_key(input: &str) -> Result<NaturalKey> {
        Ok(NaturalKey::single(input.trim()))
    }

    fn validate(attributes: &Self::Attributes) -> Result<()> {
        if attributes.first_name.trim().is_empty() {
            return Err(CanonError::MissingRequiredField {
                entity: "person_name",
                field: "first_name",
            });
        }
        Ok(())
    }

    fn build(_resolver: &Resolver, attributes: Self::Attributes) -> Result<Self> {
        Ok(attributes)
    }

    fn natural_key(&self) -> NaturalKey {
        Self::derive_key(self)
    }
}
