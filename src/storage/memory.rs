//! In-process store backed by `ahash` maps
//!
//! Used for tests and for one-shot CLI runs that do not need persistence.

use super::{NewRecord, RecordId, Store, StoredRecord, NATURAL_KEY};
use crate::entities::{EntityKind, NaturalKey};
use crate::error::{CanonError, Result};
use crate::range::{IpRange, IpVersion};
use ahash::{HashMap, HashMapExt};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

/// (kind, key name, encoded key)
type KeyEntry = (EntityKind, String, String);

struct Tables {
    next_id: i64,
    records: HashMap<(EntityKind, RecordId), StoredRecord>,
    keys: HashMap<KeyEntry, RecordId>,
    ranges: Vec<(EntityKind, RecordId, IpRange)>,
}

/// Thread-safe in-memory [`Store`]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_id: 0,
                records: HashMap::new(),
                keys: HashMap::new(),
                ranges: Vec::new(),
            }),
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| CanonError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key_entry(kind: EntityKind, name: &str, key: &NaturalKey) -> KeyEntry {
    (kind, name.to_string(), key.encode())
}

fn not_found(kind: EntityKind, id: RecordId) -> CanonError {
    CanonError::RecordNotFound {
        kind,
        id: id.0,
    }
}

impl Store for MemoryStore {
    fn find_by_key(&self, kind: EntityKind, key: &NaturalKey) -> Result<Option<RecordId>> {
        let tables = self.tables()?;
        Ok(tables.keys.get(&key_entry(kind, NATURAL_KEY, key)).copied())
    }

    fn insert(&self, kind: EntityKind, record: NewRecord) -> Result<RecordId> {
        let mut tables = self.tables()?;

        let mut entries = vec![key_entry(kind, NATURAL_KEY, &record.natural_key)];
        for (name, key) in &record.secondary_keys {
            entries.push(key_entry(kind, name, key));
        }

        // Check every key before touching anything
        let clash = entries.iter().find(|entry| tables.keys.contains_key(*entry));
        if let Some((_, _, encoded)) = clash {
            return Err(CanonError::UniquenessViolation {
                kind,
                key: encoded.clone(),
            });
        }

        tables.next_id += 1;
        let id = RecordId(tables.next_id);
        let now = Utc::now();

        for entry in entries {
            tables.keys.insert(entry, id);
        }
        if let Some(range) = record.range {
            tables.ranges.push((kind, id, range));
        }
        tables.records.insert(
            (kind, id),
            StoredRecord {
                id,
                kind,
                natural_key: record.natural_key.encode(),
                attributes: record.attributes,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    fn range_query(
        &self,
        kind: EntityKind,
        version: IpVersion,
        target: &[u8],
    ) -> Result<Vec<RecordId>> {
        let target = crate::range::EncodedIp::from_bytes(version, target.to_vec())?;
        let tables = self.tables()?;

        let mut hits: Vec<(&[u8], RecordId)> = Vec::new();
        for (range_kind, id, range) in &tables.ranges {
            if *range_kind != kind || range.version() != version {
                continue;
            }
            if range.contains(&target)? {
                hits.push((range.start().bytes(), *id));
            }
        }
        hits.sort();

        Ok(hits.into_iter().map(|(_, id)| id).collect())
    }

    fn fetch(&self, kind: EntityKind, id: RecordId) -> Result<StoredRecord> {
        let tables = self.tables()?;
        tables
            .records
            .get(&(kind, id))
            .cloned()
            .ok_or_else(|| not_found(kind, id))
    }

    fn update(&self, kind: EntityKind, id: RecordId, attributes: serde_json::Value) -> Result<()> {
        let mut tables = self.tables()?;
        let record = tables
            .records
            .get_mut(&(kind, id))
            .ok_or_else(|| not_found(kind, id))?;
        record.attributes = attributes;
        record.updated_at = Utc::now();
        Ok(())
    }

    fn count(&self, kind: EntityKind) -> Result<usize> {
        let tables = self.tables()?;
        Ok(tables.records.keys().filter(|(k, _)| *k == kind).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::{exercise_range_query, exercise_secondary_keys, exercise_store};

    #[test]
    fn test_store_contract() {
        exercise_store(&MemoryStore::new());
    }

    #[test]
    fn test_secondary_keys() {
        exercise_secondary_keys(&MemoryStore::new());
    }

    #[test]
    fn test_range_query() {
        exercise_range_query(&MemoryStore::new());
    }
}
