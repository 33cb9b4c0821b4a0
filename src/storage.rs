//! Persisted table records
//!
//! One record per table, keyed by identifier. RocksDB backs the server;
//! `MemoryStore` is used for ephemeral runs and tests.

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::{RouletteResult, StorageError};
use crate::games::types::Table;
use dashmap::DashMap;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

const TABLE_PREFIX: &[u8] = b"table:";
const META_PREFIX: &[u8] = b"meta:";

fn table_key(id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(TABLE_PREFIX.len() + id.len());
    key.extend_from_slice(TABLE_PREFIX);
    key.extend_from_slice(id.as_bytes());
    key
}

fn meta_key(key: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(META_PREFIX.len() + key.len());
    full.extend_from_slice(META_PREFIX);
    full.extend_from_slice(key);
    full
}

/// Durable home of table records
pub trait TableStore: Send + Sync {
    fn load(&self, id: &str) -> RouletteResult<Option<Table>>;

    /// Insert or replace the record for `table.id`
    fn save(&self, table: &Table) -> RouletteResult<()>;

    fn load_all(&self) -> RouletteResult<Vec<Table>>;

    /// Small opaque values that are not tables (e.g. the VRF seed)
    fn get_meta(&self, key: &[u8]) -> RouletteResult<Option<Vec<u8>>>;

    fn put_meta(&self, key: &[u8], value: &[u8]) -> RouletteResult<()>;
}

/// Non-durable store
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, Table>,
    meta: DashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn load(&self, id: &str) -> RouletteResult<Option<Table>> {
        Ok(self.tables.get(id).map(|t| t.clone()))
    }

    fn save(&self, table: &Table) -> RouletteResult<()> {
        self.tables.insert(table.id.clone(), table.clone());
        Ok(())
    }

    fn load_all(&self) -> RouletteResult<Vec<Table>> {
        let mut tables: Vec<Table> = self.tables.iter().map(|t| t.value().clone()).collect();
        tables.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tables)
    }

    fn get_meta(&self, key: &[u8]) -> RouletteResult<Option<Vec<u8>>> {
        Ok(self.meta.get(key).map(|v| v.clone()))
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> RouletteResult<()> {
        self.meta.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

/// RocksDB-backed store, bincode-encoded records
#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> RouletteResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| StorageError::DatabaseOpenFailed(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(Self { db: Arc::new(db) })
    }

    fn decode(bytes: &[u8]) -> RouletteResult<Table> {
        bincode::deserialize(bytes)
            .map_err(|e| StorageError::CorruptedData(format!("table record: {}", e)).into())
    }
}

impl TableStore for RocksStore {
    fn load(&self, id: &str) -> RouletteResult<Option<Table>> {
        let bytes = self
            .db
            .get(table_key(id))
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        bytes.map(|b| Self::decode(&b)).transpose()
    }

    fn save(&self, table: &Table) -> RouletteResult<()> {
        let bytes = bincode::serialize(table)
            .map_err(|e| StorageError::WriteFailed(format!("encode table {}: {}", table.id, e)))?;

        let mut batch = WriteBatch::default();
        batch.put(table_key(&table.id), bytes);
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn load_all(&self) -> RouletteResult<Vec<Table>> {
        let mut tables = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(TABLE_PREFIX, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(TABLE_PREFIX) {
                break;
            }
            tables.push(Self::decode(&value)?);
        }
        Ok(tables)
    }

    fn get_meta(&self, key: &[u8]) -> RouletteResult<Option<Vec<u8>>> {
        Ok(self
            .db
            .get(meta_key(key))
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?)
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> RouletteResult<()> {
        self.db
            .put(meta_key(key), value)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

/// Open the backend selected in configuration
pub fn open_store(config: &StorageConfig) -> RouletteResult<Arc<dyn TableStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Rocksdb => {
            let path = Path::new(&config.data_directory);
            if config.clear_on_start && path.exists() {
                tracing::warn!(path = %config.data_directory, "Clearing table store on start");
                std::fs::remove_dir_all(path)?;
            }
            std::fs::create_dir_all(path)?;
            Ok(Arc::new(RocksStore::open(path.join("tables"))?))
        }
    }
}
