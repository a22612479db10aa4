//! Resolution protocol
//!
//! Turns raw input into canonical records with three operations:
//!
//! - `lookup`: derive the natural key, query the store, never create
//! - `import`: parse, validate, resolve sub-records, insert
//! - `find_or_import`: `lookup`, then `import` on a miss
//!
//! `find_or_import` is not atomic. Two callers may both miss and both try to
//! create; the store's uniqueness constraint rejects the second, and that
//! `DuplicateKeyConflict` is retried once as a lookup.

mod registry;

pub use registry::{EntityHandler, EntityRegistry, ResolvedRecord};

use crate::config::{MutableFieldPolicy, ResolutionConfig};
use crate::entities::{AsnRecord, Entity, EntityKind, NaturalKey};
use crate::error::{CanonError, Result};
use crate::range;
use crate::storage::{NewRecord, RecordId, Store};
use serde::Serialize;
use std::sync::Arc;

/// Knobs for the resolver, usually taken from [`ResolutionConfig`]
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub retry_on_conflict: bool,
    pub mutable_field_policy: MutableFieldPolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from(&ResolutionConfig::default())
    }
}

impl From<&ResolutionConfig> for ResolverOptions {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            retry_on_conflict: config.retry_on_conflict,
            mutable_field_policy: config.mutable_field_policy,
        }
    }
}

/// A record together with its store id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Canonical<E> {
    pub id: RecordId,
    pub record: E,
}

/// Entry point for lookups and imports
pub struct Resolver {
    store: Arc<dyn Store>,
    registry: EntityRegistry,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(store: Arc<dyn Store>, registry: EntityRegistry, options: ResolverOptions) -> Self {
        Self {
            store,
            registry,
            options,
        }
    }

    /// Resolver over `store` with every built-in entity kind and default options
    pub fn with_defaults(store: Arc<dyn Store>) -> Self {
        Self::new(store, EntityRegistry::standard(), ResolverOptions::default())
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Find an existing record; never creates
    pub fn lookup<E: Entity>(&self, input: &E::Input) -> Result<Option<Canonical<E>>> {
        let key = E::lookup_key(input)?;
        self.lookup_key::<E>(&key)
    }

    /// Find an existing record by natural key
    pub fn lookup_key<E: Entity>(&self, key: &NaturalKey) -> Result<Option<Canonical<E>>> {
        match self.store.find_by_key(E::KIND, key)? {
            Some(id) => {
                tracing::debug!("Found {} {} as {}", E::KIND, key, id);
                Ok(Some(self.fetch::<E>(id)?))
            }
            None => Ok(None),
        }
    }

    /// Load a record by id
    pub fn fetch<E: Entity>(&self, id: RecordId) -> Result<Canonical<E>> {
        let stored = self.store.fetch(E::KIND, id)?;
        let record = serde_json::from_value(stored.attributes)
            .map_err(|e| CanonError::json(e, format!("Failed to decode {} {}", E::KIND, id)))?;
        Ok(Canonical { id, record })
    }

    /// Parse and create; fails with `DuplicateKeyConflict` if the record exists
    pub fn import<E: Entity>(&self, input: &E::Input) -> Result<Canonical<E>> {
        let attributes = E::parse(input)?;
        self.import_attributes::<E>(attributes)
    }

    /// Create from already-parsed attributes
    ///
    /// Validation runs before any sub-record is resolved, so a rejected input
    /// leaves the store untouched.
    pub fn import_attributes<E: Entity>(&self, attributes: E::Attributes) -> Result<Canonical<E>> {
        E::validate(&attributes)?;
        let record = E::build(self, attributes)?;
        self.insert(record)
    }

    fn insert<E: Entity>(&self, record: E) -> Result<Canonical<E>> {
        let natural_key = record.natural_key();
        let new = NewRecord {
            natural_key: natural_key.clone(),
            secondary_keys: record
                .secondary_keys()
                .into_iter()
                .map(|(name, key)| (name.to_string(), key))
                .collect(),
            attributes: serde_json::to_value(&record)
                .map_err(|e| CanonError::json(e, format!("Failed to encode {}", E::KIND)))?,
            range: record.ip_range(),
        };

        match self.store.insert(E::KIND, new) {
            Ok(id) => {
                tracing::debug!("Created {} {} as {}", E::KIND, natural_key, id);
                Ok(Canonical { id, record })
            }
            Err(CanonError::UniquenessViolation { kind, key }) => {
                tracing::warn!("Create of {} collided on key {}", kind, key);
                Err(CanonError::DuplicateKeyConflict { kind, key })
            }
            Err(e) => Err(e),
        }
    }

    /// Return the existing record or create it
    pub fn find_or_import<E: Entity>(&self, input: &E::Input) -> Result<Canonical<E>> {
        if let Some(found) = self.lookup::<E>(input)? {
            return Ok(found);
        }
        let attributes = E::parse(input)?;
        self.create_or_retry::<E>(E::derive_key(&attributes), attributes)
    }

    /// [`find_or_import`](Self::find_or_import) for already-parsed attributes
    ///
    /// Composite entities use this to resolve their sub-records.
    pub fn find_or_import_attributes<E: Entity>(
        &self,
        attributes: E::Attributes,
    ) -> Result<Canonical<E>> {
        let key = E::derive_key(&attributes);
        if let Some(found) = self.lookup_key::<E>(&key)? {
            return Ok(found);
        }
        self.create_or_retry::<E>(key, attributes)
    }

    fn create_or_retry<E: Entity>(
        &self,
        key: NaturalKey,
        attributes: E::Attributes,
    ) -> Result<Canonical<E>> {
        match self.import_attributes::<E>(attributes) {
            Err(conflict) if conflict.is_retryable() && self.options.retry_on_conflict => {
                tracing::debug!("Retrying {} {} as a lookup", E::KIND, key);
                // A clash on a secondary key may leave the natural key absent
                self.lookup_key::<E>(&key)?.ok_or(conflict)
            }
            result => result,
        }
    }

    /// Create, or merge mutable descriptive fields into the existing record
    pub fn import_or_refresh<E: Entity>(&self, input: &E::Input) -> Result<Canonical<E>> {
        let attributes = E::parse(input)?;
        let key = E::derive_key(&attributes);

        let Some(mut existing) = self.lookup_key::<E>(&key)? else {
            return self.create_or_retry::<E>(key, attributes);
        };

        E::validate(&attributes)?;
        if existing
            .record
            .refresh(&attributes, self.options.mutable_field_policy)
        {
            let value = serde_json::to_value(&existing.record)
                .map_err(|e| CanonError::json(e, format!("Failed to encode {}", E::KIND)))?;
            self.store.update(E::KIND, existing.id, value)?;
            tracing::debug!("Refreshed {} {}", E::KIND, existing.id);
        }
        Ok(existing)
    }

    /// ASN records whose range contains `ip_text`
    ///
    /// Only ranges of the address's own version are considered.
    pub fn asn_containing(&self, ip_text: &str) -> Result<Vec<Canonical<AsnRecord>>> {
        let addr = range::encode(ip_text.trim())?;
        self.store
            .range_query(EntityKind::Asn, addr.version(), addr.bytes())?
            .into_iter()
            .map(|id| self.fetch::<AsnRecord>(id))
            .collect()
    }

    /// Parse raw text for `kind` without touching the store
    pub fn parse_text(&self, kind: EntityKind, raw: &str) -> Result<serde_json::Value> {
        self.registry.get(kind)?.parse(raw)
    }

    /// `lookup` for a kind chosen at runtime
    pub fn lookup_text(&self, kind: EntityKind, raw: &str) -> Result<Option<ResolvedRecord>> {
        self.registry.get(kind)?.lookup(self, raw)
    }

    /// `find_or_import` for a kind chosen at runtime
    pub fn resolve_text(&self, kind: EntityKind, raw: &str) -> Result<ResolvedRecord> {
        self.registry.get(kind)?.find_or_import(self, raw)
    }
}
