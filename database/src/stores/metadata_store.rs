use crate::db::CF_METADATA;
use crate::{Database, DbResult};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Small keyed bookkeeping values (sync progress flags and the like)
pub struct MetadataStore {
    db: Arc<Database>,
}

impl MetadataStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn set_flag(&self, key: &str, value: bool) -> DbResult<()> {
        self.db.put(CF_METADATA, key.as_bytes(), &[value as u8])
    }

    pub fn get_flag(&self, key: &str) -> DbResult<bool> {
        Ok(matches!(self.db.get(CF_METADATA, key.as_bytes())?.as_deref(), Some([1])))
    }

    pub fn stage_u64(&self, batch: &mut WriteBatch, key: &str, value: u64) -> DbResult<()> {
        self.db.batch_put(batch, CF_METADATA, key.as_bytes(), &value.to_le_bytes())
    }

    pub fn get_u64(&self, key: &str) -> DbResult<Option<u64>> {
        Ok(self
            .db
            .get(CF_METADATA, key.as_bytes())?
            .and_then(|bytes| bytes.try_into().ok())
            .map(u64::from_le_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flags_and_counters() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = MetadataStore::new(db.clone());

        assert!(!store.get_flag("synced").unwrap());
        store.set_flag("synced", true).unwrap();
        assert!(store.get_flag("synced").unwrap());

        assert_eq!(store.get_u64("cursor").unwrap(), None);
        let mut batch = db.batch();
        store.stage_u64(&mut batch, "cursor", 7).unwrap();
        db.write_batch(batch).unwrap();
        assert_eq!(store.get_u64("cursor").unwrap(), Some(7));
    }
}
