//! Score table implementations.
//!
//! [`RocksScoreStore`] keeps one row per vault in the `scores` column family:
//! key is the big-endian vault id (so iteration is in vault order), value is
//! the JSON-encoded [`ScoreResult`]. [`MemoryScoreStore`] backs ephemeral
//! runs and tests.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};

use helios_core::error::StorageError;
use helios_core::traits::Storage;
use helios_core::types::{ScoreResult, ScoreStats, VaultId};

const CF_SCORES: &str = "scores";

/// RocksDB-backed score table.
pub struct RocksScoreStore {
    db: DB,
}

fn backend(e: rocksdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn decode_key(key: &[u8]) -> Result<VaultId, StorageError> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| StorageError::Backend(format!("invalid key length {}", key.len())))?;
    Ok(VaultId::from_be_bytes(bytes))
}

fn decode_row(vault_id: VaultId, bytes: &[u8]) -> Result<ScoreResult, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt { vault_id, reason: e.to_string() })
}

impl RocksScoreStore {
    /// Open or create the score table at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cfs = vec![ColumnFamilyDescriptor::new(CF_SCORES, Options::default())];
        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cfs).map_err(backend)?;
        Ok(Self { db })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(CF_SCORES)
            .ok_or_else(|| StorageError::Backend(format!("missing column family: {CF_SCORES}")))
    }
}

impl Storage for RocksScoreStore {
    fn upsert_score(&self, result: &ScoreResult) -> Result<(), StorageError> {
        let value = serde_json::to_vec(result).map_err(|e| StorageError::Backend(e.to_string()))?;
        self.db
            .put_cf(self.cf()?, result.vault_id.to_be_bytes(), value)
            .map_err(backend)
    }

    fn get_score(&self, vault_id: VaultId) -> Result<Option<ScoreResult>, StorageError> {
        match self.db.get_cf(self.cf()?, vault_id.to_be_bytes()).map_err(backend)? {
            Some(bytes) => decode_row(vault_id, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn list_scored_vault_ids(&self) -> Result<BTreeSet<VaultId>, StorageError> {
        let mut ids = BTreeSet::new();
        for item in self.db.iterator_cf(self.cf()?, IteratorMode::Start) {
            let (key, _) = item.map_err(backend)?;
            ids.insert(decode_key(&key)?);
        }
        Ok(ids)
    }

    // Single scan instead of the trait's per-id lookups.
    fn aggregate_stats(&self) -> Result<ScoreStats, StorageError> {
        let mut stats = ScoreStats::default();
        let mut total: u64 = 0;
        for item in self.db.iterator_cf(self.cf()?, IteratorMode::Start) {
            let (key, value) = item.map_err(backend)?;
            let row = decode_row(decode_key(&key)?, &value)?;
            stats.count += 1;
            total += u64::from(row.score);
            stats.max_timestamp = stats.max_timestamp.max(Some(row.computed_at));
        }
        if stats.count > 0 {
            stats.average = Some(total as f64 / stats.count as f64);
        }
        Ok(stats)
    }
}

/// In-memory score table.
#[derive(Default)]
pub struct MemoryScoreStore {
    scores: RwLock<HashMap<VaultId, ScoreResult>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryScoreStore {
    fn upsert_score(&self, result: &ScoreResult) -> Result<(), StorageError> {
        self.scores.write().insert(result.vault_id, result.clone());
        Ok(())
    }

    fn get_score(&self, vault_id: VaultId) -> Result<Option<ScoreResult>, StorageError> {
        Ok(self.scores.read().get(&vault_id).cloned())
    }

    fn list_scored_vault_ids(&self) -> Result<BTreeSet<VaultId>, StorageError> {
        Ok(self.scores.read().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn result(vault_id: VaultId, score: u8, secs: i64) -> ScoreResult {
        let mut r = ScoreResult::neutral(vault_id, Utc.timestamp_opt(secs, 0).unwrap(), None);
        r.score = score;
        r
    }

    #[test]
    fn memory_upsert_replaces() {
        let store = MemoryScoreStore::new();
        store.upsert_score(&result(1, 40, 10)).unwrap();
        store.upsert_score(&result(1, 70, 20)).unwrap();
        assert_eq!(store.get_score(1).unwrap().unwrap().score, 70);
        assert_eq!(store.list_scored_vault_ids().unwrap().len(), 1);
    }

    #[test]
    fn memory_stats_use_default_fold() {
        let store = MemoryScoreStore::new();
        assert_eq!(store.aggregate_stats().unwrap(), ScoreStats::default());
        store.upsert_score(&result(1, 40, 10)).unwrap();
        store.upsert_score(&result(2, 80, 30)).unwrap();
        let stats = store.aggregate_stats().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.average, Some(60.0));
        assert_eq!(stats.max_timestamp, Some(Utc.timestamp_opt(30, 0).unwrap()));
    }

    #[test]
    fn key_decoding_rejects_bad_length() {
        assert_eq!(decode_key(&7u64.to_be_bytes()).unwrap(), 7);
        assert!(decode_key(&[1, 2, 3]).is_err());
    }
}
