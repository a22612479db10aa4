//! SQLite database management with migrations
//!
//! Canonical records live in `records`, one row per record with its JSON
//! attributes. Secondary unique keys go to `record_keys` and address ranges to
//! `ip_ranges`, all written in one transaction per insert.

use super::{NewRecord, RecordId, Store, StoredRecord};
use crate::config::StorageConfig;
use crate::entities::{EntityKind, NaturalKey};
use crate::error::{CanonError, Result};
use crate::range::IpVersion;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, ErrorCode, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open with default storage settings
    pub fn new(db_path: &Path) -> Result<Self> {
        Self::open(db_path, &StorageConfig::default())
    }

    /// Open (creating if needed) and migrate the database at `db_path`
    pub fn open(db_path: &Path, config: &StorageConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CanonError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        // Per-connection settings must be applied to every pooled connection
        let pragmas = format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = {};",
            config.busy_timeout_ms
        );
        let manager = SqliteConnectionManager::file(db_path)
            .with_init(move |conn| conn.execute_batch(&pragmas));

        // Waiting for a pooled connection is bounded like waiting for a lock
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_millis(config.busy_timeout_ms))
            .build(manager)?;

        {
            let conn = pool.get()?;

            // WAL is persistent, once per database file is enough
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }

        let db = Self { pool };
        db.migrate()?;

        tracing::debug!("Opened database at {:?}", db_path);
        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;

        let mut record_counts = BTreeMap::new();
        {
            let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM records GROUP BY kind")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (kind, count) = row?;
                record_counts.insert(kind, count as usize);
            }
        }

        let key_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM record_keys", [], |row| row.get(0))?;

        let range_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM ip_ranges", [], |row| row.get(0))?;

        Ok(DbStats {
            record_counts,
            key_count: key_count as usize,
            range_count: range_count as usize,
        })
    }
}

/// Database statistics
#[derive(Debug, Default, serde::Serialize)]
pub struct DbStats {
    /// Records per kind tag
    pub record_counts: BTreeMap<String, usize>,
    pub key_count: usize,
    pub range_count: usize,
}

impl DbStats {
    pub fn total_records(&self) -> usize {
        self.record_counts.values().sum()
    }
}

/// Map a constraint failure to `UniquenessViolation`, anything else passes through
fn uniqueness(err: rusqlite::Error, kind: EntityKind, key: &str) -> CanonError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        let unique = failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
        if failure.code == ErrorCode::ConstraintViolation && unique {
            return CanonError::UniquenessViolation {
                kind,
                key: key.to_string(),
            };
        }
    }
    CanonError::Database(err)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CanonError::Other(anyhow::anyhow!("Bad timestamp {:?}: {}", text, e)))
}

impl Store for Database {
    fn find_by_key(&self, kind: EntityKind, key: &NaturalKey) -> Result<Option<RecordId>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM records WHERE kind = ?1 AND natural_key = ?2",
                params![kind.as_str(), key.encode()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(RecordId))
    }

    fn insert(&self, kind: EntityKind, record: NewRecord) -> Result<RecordId> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let natural_key = record.natural_key.encode();
        let attributes = serde_json::to_string(&record.attributes)
            .map_err(|e| CanonError::json(e, "Failed to encode record attributes"))?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO records (kind, natural_key, attributes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![kind.as_str(), natural_key, attributes, now],
        )
        .map_err(|e| uniqueness(e, kind, &natural_key))?;
        let id = tx.last_insert_rowid();

        for (name, key) in &record.secondary_keys {
            let encoded = key.encode();
            tx.execute(
                "INSERT INTO record_keys (kind, key_name, key_value, record_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![kind.as_str(), name, encoded, id],
            )
            .map_err(|e| uniqueness(e, kind, &encoded))?;
        }

        if let Some(range) = &record.range {
            tx.execute(
                "INSERT INTO ip_ranges (record_id, kind, version, range_start, range_end)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    kind.as_str(),
                    range.version().number(),
                    range.start().bytes(),
                    range.end().bytes()
                ],
            )?;
        }

        tx.commit()?;
        Ok(RecordId(id))
    }

    fn range_query(
        &self,
        kind: EntityKind,
        version: IpVersion,
        target: &[u8],
    ) -> Result<Vec<RecordId>> {
        if target.len() != version.width() {
            return Err(CanonError::InvalidField {
                entity: "ip_range",
                field: "target",
                message: format!(
                    "{} target must be {} bytes, got {}",
                    version,
                    version.width(),
                    target.len()
                ),
            });
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT record_id FROM ip_ranges
             WHERE kind = ?1 AND version = ?2 AND range_start <= ?3 AND range_end >= ?3
             ORDER BY range_start",
        )?;
        let ids = stmt
            .query_map(params![kind.as_str(), version.number(), target], |row| {
                row.get::<_, i64>(0)
            })?
            .map(|id| id.map(RecordId))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ids)
    }

    fn fetch(&self, kind: EntityKind, id: RecordId) -> Result<StoredRecord> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT natural_key, attributes, created_at, updated_at
                 FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id.0],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let (natural_key, attributes, created_at, updated_at) =
            row.ok_or_else(|| CanonError::RecordNotFound {
                kind,
                id: id.0,
            })?;

        Ok(StoredRecord {
            id,
            kind,
            natural_key,
            attributes: serde_json::from_str(&attributes)
                .map_err(|e| CanonError::json(e, format!("Corrupt attributes on {kind} {id}")))?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn update(&self, kind: EntityKind, id: RecordId, attributes: serde_json::Value) -> Result<()> {
        let attributes = serde_json::to_string(&attributes)
            .map_err(|e| CanonError::json(e, "Failed to encode record attributes"))?;

        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE records SET attributes = ?1, updated_at = ?2 WHERE kind = ?3 AND id = ?4",
            params![attributes, Utc::now().to_rfc3339(), kind.as_str(), id.0],
        )?;

        if changed == 0 {
            return Err(CanonError::RecordNotFound {
                kind,
                id: id.0,
            });
        }
        Ok(())
    }

    fn count(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Canonical records, one natural key per kind
    CREATE TABLE records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        natural_key TEXT NOT NULL,
        attributes TEXT NOT NULL,  -- JSON
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (kind, natural_key)
    );

    CREATE INDEX idx_records_kind ON records(kind);

    -- Secondary unique keys
    CREATE TABLE record_keys (
        kind TEXT NOT NULL,
        key_name TEXT NOT NULL,
        key_value TEXT NOT NULL,
        record_id INTEGER NOT NULL,
        PRIMARY KEY (kind, key_name, key_value),
        FOREIGN KEY (record_id) REFERENCES records(id) ON DELETE CASCADE
    );

    -- Address ranges as fixed-width big-endian bytes
    CREATE TABLE ip_ranges (
        record_id INTEGER PRIMARY KEY,
        kind TEXT NOT NULL,
        version INTEGER NOT NULL CHECK (version IN (4, 6)),
        range_start BLOB NOT NULL,
        range_end BLOB NOT NULL,
        CHECK (length(range_start) = length(range_end)),
        CHECK (length(range_start) = CASE version WHEN 4 THEN 4 ELSE 16 END),
        CHECK (range_start <= range_end),
        FOREIGN KEY (record_id) REFERENCES records(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_ip_ranges_lookup ON ip_ranges(kind, version, range_start, range_end);
    "#,
];
