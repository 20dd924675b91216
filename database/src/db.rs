use crate::errors::{DbError, DbResult};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

pub const CF_BLOCKS: &str = "blocks";
pub const CF_RAW_BLOCKS: &str = "raw_blocks";
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_BLOCK_TRANSACTIONS: &str = "block_transactions";
pub const CF_TRANSACTION_OUTPUTS: &str = "transaction_outputs";
pub const CF_ACCEPTED_TRANSACTIONS: &str = "block_accepted_transactions";
pub const CF_ACCEPTED_BLOCKS: &str = "block_accepted_blocks";
pub const CF_DAA_WINDOW: &str = "daa_window";
pub const CF_METADATA: &str = "metadata";

/// Thin wrapper around rocksdb exposing the bucketed key-value interface
/// the stores are written against: `get`/`put`/`exists` plus atomic
/// multi-key commit through [`WriteBatch`].
pub struct Database {
    db: Arc<DB>,
    is_closed: Arc<RwLock<bool>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(10000);
        opts.set_keep_log_file_num(10);
        opts.set_max_background_jobs(4);
        opts.set_bytes_per_sync(1048576);
        opts.increase_parallelism(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);

        let cf_names = vec![
            CF_BLOCKS,
            CF_RAW_BLOCKS,
            CF_TRANSACTIONS,
            CF_BLOCK_TRANSACTIONS,
            CF_TRANSACTION_OUTPUTS,
            CF_ACCEPTED_TRANSACTIONS,
            CF_ACCEPTED_BLOCKS,
            CF_DAA_WINDOW,
            CF_METADATA,
        ];

        let cf_descriptors: Vec<_> = cf_names.iter().map(|name| ColumnFamilyDescriptor::new(*name, Options::default())).collect();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(Self { db: Arc::new(db), is_closed: Arc::new(RwLock::new(false)) })
    }

    fn check_closed(&self) -> DbResult<()> {
        if *self.is_closed.read() {
            return Err(DbError::DatabaseClosed);
        }
        Ok(())
    }

    fn get_cf_handle(&self, cf_name: &str) -> DbResult<&rocksdb::ColumnFamily> {
        self.db.cf_handle(cf_name).ok_or_else(|| DbError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.check_closed()?;
        let cf = self.get_cf_handle(cf_name)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    pub fn get(&self, cf_name: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.check_closed()?;
        let cf = self.get_cf_handle(cf_name)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    pub fn delete(&self, cf_name: &str, key: &[u8]) -> DbResult<()> {
        self.check_closed()?;
        let cf = self.get_cf_handle(cf_name)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    pub fn exists(&self, cf_name: &str, key: &[u8]) -> DbResult<bool> {
        self.check_closed()?;
        let cf = self.get_cf_handle(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    pub fn batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    /// Stages a put into a batch; nothing is visible until [`Self::write_batch`]
    pub fn batch_put(&self, batch: &mut WriteBatch, cf_name: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        let cf = self.get_cf_handle(cf_name)?;
        batch.put_cf(cf, key, value);
        Ok(())
    }

    pub fn batch_delete(&self, batch: &mut WriteBatch, cf_name: &str, key: &[u8]) -> DbResult<()> {
        let cf = self.get_cf_handle(cf_name)?;
        batch.delete_cf(cf, key);
        Ok(())
    }

    /// Atomically commits a batch; either every staged write lands or none
    pub fn write_batch(&self, batch: WriteBatch) -> DbResult<()> {
        self.check_closed()?;
        self.db.write(batch)?;
        Ok(())
    }

    pub fn iterator(&self, cf_name: &str, mode: IteratorMode) -> DbResult<rocksdb::DBIteratorWithThreadMode<'_, DB>> {
        self.check_closed()?;
        let cf = self.get_cf_handle(cf_name)?;
        Ok(self.db.iterator_cf(cf, mode))
    }

    /// Iterates every (key, value) pair whose key begins with `prefix`
    pub fn prefix_scan(&self, cf_name: &str, prefix: &[u8]) -> DbResult<Vec<(Box<[u8]>, Box<[u8]>)>> {
        self.check_closed()?;
        let cf = self.get_cf_handle(cf_name)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::From(prefix, rocksdb::Direction::Forward));
        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key, value));
        }
        Ok(out)
    }

    pub fn close(&self) {
        *self.is_closed.write() = true;
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), is_closed: self.is_closed.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_open_put_get() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();
        db.put(CF_METADATA, b"k", b"v").unwrap();
        assert_eq!(db.get(CF_METADATA, b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_batch_is_atomic_until_written() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();

        let mut batch = db.batch();
        db.batch_put(&mut batch, CF_METADATA, b"a", b"1").unwrap();
        db.batch_put(&mut batch, CF_METADATA, b"b", b"2").unwrap();
        assert_eq!(db.get(CF_METADATA, b"a").unwrap(), None);

        db.write_batch(batch).unwrap();
        assert_eq!(db.get(CF_METADATA, b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.get(CF_METADATA, b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_dropped_batch_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();

        let mut batch = db.batch();
        db.batch_put(&mut batch, CF_METADATA, b"x", b"1").unwrap();
        drop(batch);
        assert_eq!(db.get(CF_METADATA, b"x").unwrap(), None);
    }

    #[test]
    fn test_prefix_scan_stops_at_boundary() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();
        db.put(CF_METADATA, b"p/0", b"a").unwrap();
        db.put(CF_METADATA, b"p/1", b"b").unwrap();
        db.put(CF_METADATA, b"q/0", b"c").unwrap();

        let hits = db.prefix_scan(CF_METADATA, b"p/").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(&*hits[0].1, b"a");
        assert_eq!(&*hits[1].1, b"b");
    }
}
