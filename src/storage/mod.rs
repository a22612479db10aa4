//! Storage port for canonical records
//!
//! The resolver talks to storage only through [`Store`]. Two implementations
//! ship with the crate: [`Database`] (SQLite, pooled) and [`MemoryStore`].
//! Both enforce natural-key uniqueness themselves; the resolver relies on
//! that constraint to close the lookup/create race.

pub mod database;
pub mod memory;

use crate::config::{StorageBackend, StorageConfig};
use crate::entities::{EntityKind, NaturalKey};
use crate::error::Result;
use crate::range::{IpRange, IpVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use database::{Database, DbPool, DbStats};
pub use memory::MemoryStore;

/// Name under which the primary natural key is indexed
pub const NATURAL_KEY: &str = "natural";

/// Store-assigned record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record ready to be inserted
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub natural_key: NaturalKey,
    /// Additional named keys that must also be unique within the kind
    pub secondary_keys: Vec<(String, NaturalKey)>,
    pub attributes: serde_json::Value,
    pub range: Option<IpRange>,
}

/// A record as held by the store
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub kind: EntityKind,
    pub natural_key: String,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence capability the resolver is written against
pub trait Store: Send + Sync {
    /// Id of the record of `kind` whose natural key is `key`
    fn find_by_key(&self, kind: EntityKind, key: &NaturalKey) -> Result<Option<RecordId>>;

    /// Insert a record; fails with `UniquenessViolation` if any of its keys
    /// already exists for `kind`, leaving the store unchanged
    fn insert(&self, kind: EntityKind, record: NewRecord) -> Result<RecordId>;

    /// Ids of `kind` records whose range of `version` contains `target`,
    /// ordered by range start
    fn range_query(
        &self,
        kind: EntityKind,
        version: IpVersion,
        target: &[u8],
    ) -> Result<Vec<RecordId>>;

    /// Fetch a record; `RecordNotFound` if absent
    fn fetch(&self, kind: EntityKind, id: RecordId) -> Result<StoredRecord>;

    /// Replace a record's attributes; keys never change
    fn update(&self, kind: EntityKind, id: RecordId, attributes: serde_json::Value) -> Result<()>;

    /// Number of records of `kind`
    fn count(&self, kind: EntityKind) -> Result<usize>;
}

/// Open the store selected by configuration
pub fn open_store(config: &StorageConfig, database_path: &Path) -> Result<Arc<dyn Store>> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(Database::open(database_path, config)?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Table statistics for the configured store
///
/// A memory store starts empty in every process, so it reports zeroes.
pub fn store_stats(config: &StorageConfig, database_path: &Path) -> Result<DbStats> {
    match config.backend {
        StorageBackend::Sqlite => Database::open(database_path, config)?.stats(),
        StorageBackend::Memory => Ok(DbStats::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanonError;

    /// Behaviour every store must share
    pub(crate) fn exercise_store(store: &dyn Store) {
        let key = NaturalKey::single("CVE-2022-1234");
        let record = NewRecord {
            natural_key: key.clone(),
            secondary_keys: vec![],
            attributes: serde_json::json!({"full_id": "CVE-2022-1234"}),
            range: None,
        };

        assert_eq!(store.find_by_key(EntityKind::Advisory, &key).unwrap(), None);
        let id = store.insert(EntityKind::Advisory, record.clone()).unwrap();
        assert_eq!(store.find_by_key(EntityKind::Advisory, &key).unwrap(), Some(id));

        // Same key under another kind does not clash
        store.insert(EntityKind::CertName, record.clone()).unwrap();

        assert!(matches!(
            store.insert(EntityKind::Advisory, record),
            Err(CanonError::UniquenessViolation {
                kind: EntityKind::Advisory,
                ..
            })
        ));
        assert_eq!(store.count(EntityKind::Advisory).unwrap(), 1);

        let fetched = store.fetch(EntityKind::Advisory, id).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.natural_key, key.encode());
        assert_eq!(fetched.attributes["full_id"], "CVE-2022-1234");

        store
            .update(
                EntityKind::Advisory,
                id,
                serde_json::json!({"full_id": "CVE-2022-1234", "note": "x"}),
            )
            .unwrap();
        let updated = store.fetch(EntityKind::Advisory, id).unwrap();
        assert_eq!(updated.attributes["note"], "x");
        assert!(updated.updated_at >= updated.created_at);

        assert!(matches!(
            store.fetch(EntityKind::Advisory, RecordId(9999)),
            Err(CanonError::RecordNotFound {
                kind: EntityKind::Advisory,
                id: 9999
            })
        ));
        assert!(matches!(
            store.update(EntityKind::PersonName, id, serde_json::json!({})),
            Err(CanonError::RecordNotFound {
                kind: EntityKind::PersonName,
                ..
            })
        ));
    }

    pub(crate) fn exercise_secondary_keys(store: &dyn Store) {
        let pair = NaturalKey::from_parts(vec![Some("1".to_string()), Some("2".to_string())]);
        let first = NewRecord {
            natural_key: NaturalKey::single("a@example.com"),
            secondary_keys: vec![("user_host".to_string(), pair.clone())],
            attributes: serde_json::json!({}),
            range: None,
        };
        let second = NewRecord {
            natural_key: NaturalKey::single("A@example.com"),
            secondary_keys: vec![("user_host".to_string(), pair)],
            attributes: serde_json::json!({}),
            range: None,
        };

        store.insert(EntityKind::EmailAddress, first).unwrap();
        assert!(matches!(
            store.insert(EntityKind::EmailAddress, second),
            Err(CanonError::UniquenessViolation { .. })
        ));
        // The rejected insert left nothing behind
        assert_eq!(store.count(EntityKind::EmailAddress).unwrap(), 1);
        assert_eq!(
            store
                .find_by_key(EntityKind::EmailAddress, &NaturalKey::single("A@example.com"))
                .unwrap(),
            None
        );
    }

    pub(crate) fn exercise_range_query(store: &dyn Store) {
        let ranges = [
            ("4.0.0.0", "4.7.168.255"),
            ("64:ff9b::1:0:0", "100::ffff:ffff:ffff:ffff"),
            ("4.4.0.0", "4.4.255.255"),
        ];
        let mut ids = Vec::new();
        for (start, end) in ranges {
            let record = NewRecord {
                natural_key: NaturalKey::from_parts(vec![
                    Some(start.to_string()),
                    Some(end.to_string()),
                ]),
                secondary_keys: vec![],
                attributes: serde_json::json!({}),
                range: Some(IpRange::from_text(start, end).unwrap()),
            };
            ids.push(store.insert(EntityKind::Asn, record).unwrap());
        }

        let target = crate::range::encode("4.4.4.4").unwrap();
        let hits = store
            .range_query(EntityKind::Asn, target.version(), target.bytes())
            .unwrap();
        assert_eq!(hits, vec![ids[0], ids[2]]);

        let outside = crate::range::encode("4.7.169.0").unwrap();
        assert!(store
            .range_query(EntityKind::Asn, outside.version(), outside.bytes())
            .unwrap()
            .is_empty());

        // Wrong width for the version is rejected
        assert!(store
            .range_query(EntityKind::Asn, IpVersion::V6, target.bytes())
            .is_err());
    }

    #[test]
    fn test_store_stats_follow_backend() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("stats.db");
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            ..StorageConfig::default()
        };

        let store = open_store(&config, &db_path).unwrap();
        exercise_secondary_keys(store.as_ref());
        drop(store);

        let stats = store_stats(&config, &db_path).unwrap();
        assert!(stats.total_records() > 0);
        assert!(stats.key_count > 0);

        let memory = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let stats = store_stats(&memory, &db_path).unwrap();
        assert_eq!(stats.total_records(), 0);
        assert_eq!(stats.range_count, 0);
    }
}
