use super::{Canonical, Resolver};
use crate::entities::{
    Advisory, AsnRecord, CertIssuer, CertName, CertSubject, Certificate, Credential, EmailAddress,
    Entity, EntityKind, HostName, Password, PersonName, PhoneNumber, RawInput, UserName,
};
use crate::error::{CanonError, Result};
use crate::storage::RecordId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// A resolved record with its attributes as JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRecord {
    pub kind: EntityKind,
    pub id: RecordId,
    pub record: serde_json::Value,
}

/// Type-erased resolution over raw text for one entity kind
pub trait EntityHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Parsed attributes, without touching the store
    fn parse(&self, raw: &str) -> Result<serde_json::Value>;

    fn lookup(&self, resolver: &Resolver, raw: &str) -> Result<Option<ResolvedRecord>>;

    fn find_or_import(&self, resolver: &Resolver, raw: &str) -> Result<ResolvedRecord>;
}

struct TypedHandler<E>(PhantomData<fn() -> E>);

fn erase<E: Entity>(canonical: Canonical<E>) -> Result<ResolvedRecord> {
    Ok(ResolvedRecord {
        kind: E::KIND,
        id: canonical.id,
        record: serde_json::to_value(&canonical.record)
            .map_err(|e| CanonError::json(e, format!("Failed to encode {}", E::KIND)))?,
    })
}

impl<E: Entity> EntityHandler for TypedHandler<E> {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    fn parse(&self, raw: &str) -> Result<serde_json::Value> {
        let input = <E::Input as RawInput>::from_raw(raw)?;
        let attributes = E::parse(&*input)?;
        serde_json::to_value(&attributes)
            .map_err(|e| CanonError::json(e, format!("Failed to encode {} attributes", E::KIND)))
    }

    fn lookup(&self, resolver: &Resolver, raw: &str) -> Result<Option<ResolvedRecord>> {
        let input = <E::Input as RawInput>::from_raw(raw)?;
        resolver.lookup::<E>(&*input)?.map(erase).transpose()
    }

    fn find_or_import(&self, resolver: &Resolver, raw: &str) -> Result<ResolvedRecord> {
        let input = <E::Input as RawInput>::from_raw(raw)?;
        erase(resolver.find_or_import::<E>(&*input)?)
    }
}

/// Mapping from entity kind to its handler
///
/// Built explicitly and handed to the [`Resolver`]; there is no global
/// registry.
#[derive(Default)]
pub struct EntityRegistry {
    handlers: BTreeMap<EntityKind, Box<dyn EntityHandler>>,
}

impl EntityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in entity kind
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register::<PersonName>()
            .register::<PhoneNumber>()
            .register::<UserName>()
            .register::<HostName>()
            .register::<EmailAddress>()
            .register::<Password>()
            .register::<Credential>()
            .register::<Advisory>()
            .register::<CertName>()
            .register::<CertSubject>()
            .register::<CertIssuer>()
            .register::<Certificate>()
            .register::<AsnRecord>();
        registry
    }

    /// Add (or replace) the handler for `E::KIND`
    pub fn register<E: Entity>(&mut self) -> &mut Self {
        self.handlers
            .insert(E::KIND, Box::new(TypedHandler::<E>(PhantomData)));
        self
    }

    pub fn get(&self, kind: EntityKind) -> Result<&dyn EntityHandler> {
        self.handlers
            .get(&kind)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| CanonError::UnknownEntityKind(kind.to_string()))
    }

    /// Registered kinds in tag order
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.handlers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::resolve::ResolverOptions;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_standard_registry_covers_every_kind() {
        let registry = EntityRegistry::standard();
        let kinds: Vec<EntityKind> = registry.kinds().collect();
        assert_eq!(kinds.len(), EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_unregistered_kind() {
        let mut registry = EntityRegistry::new();
        registry.register::<Advisory>();
        let resolver = Resolver::new(
            Arc::new(MemoryStore::new()),
            registry,
            ResolverOptions::default(),
        );

        assert!(resolver.resolve_text(EntityKind::Advisory, "CVE-2022-1234").is_ok());
        assert!(matches!(
            resolver.resolve_text(EntityKind::PersonName, "John Smith"),
            Err(CanonError::UnknownEntityKind(_))
        ));
    }

    #[test]
    fn test_parse_surfaces_format_errors() {
        let registry = EntityRegistry::standard();
        let handler = registry.get(EntityKind::Credential).unwrap();

        let parsed = handler.parse("admin:hunter2:x").unwrap();
        assert_eq!(parsed["user"], "admin");
        assert_eq!(parsed["password"], "hunter2:x");

        assert!(matches!(
            handler.parse("foo"),
            Err(CanonError::Format(FormatError::InvalidCredential(_)))
        ));
    }
}
