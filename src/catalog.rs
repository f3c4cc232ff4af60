use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::Result;

/// index name -> creation time (milliseconds since the epoch)
const INDICES: TableDefinition<&str, u64> = TableDefinition::new("indices");
/// "index/type" -> creation time (milliseconds since the epoch)
const TYPES: TableDefinition<&str, u64> = TableDefinition::new("types");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Node-level bookkeeping that lives beside the document store: which indices
/// and types have been created, and node settings such as the cluster name.
///
/// An index keeps existing after its last document is deleted, which is why
/// existence is recorded here instead of being derived from document counts.
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(INDICES)?;
        txn.open_table(TYPES)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Indices --

    /// Record that `index` holds documents of `doc_type`, creating the index
    /// on first use. Returns `true` when the index did not exist before.
    pub fn ensure_type(&self, index: &str, doc_type: &str) -> Result<bool> {
        if self.type_exists(index, doc_type)? {
            return Ok(false);
        }

        let now = now_millis();
        let key = type_key(index, doc_type);
        let txn = self.db.begin_write()?;
        let created = {
            let mut indices = txn.open_table(INDICES)?;
            let created = indices.get(index)?.is_none();
            if created {
                indices.insert(index, now)?;
            }
            let mut types = txn.open_table(TYPES)?;
            types.insert(key.as_str(), now)?;
            created
        };
        txn.commit()?;
        Ok(created)
    }

    pub fn index_exists(&self, index: &str) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(INDICES)?;
        Ok(table.get(index)?.is_some())
    }

    pub fn type_exists(&self, index: &str, doc_type: &str) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TYPES)?;
        Ok(table.get(type_key(index, doc_type).as_str())?.is_some())
    }

    pub fn list_indices(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(INDICES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            result.push(k.value().to_string());
        }
        Ok(result)
    }

    /// Types registered under `index`, in key order.
    pub fn list_types(&self, index: &str) -> Result<Vec<String>> {
        let prefix = format!("{index}/");
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TYPES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            if let Some(doc_type) = k.value().strip_prefix(&prefix) {
                result.push(doc_type.to_string());
            }
        }
        Ok(result)
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

fn type_key(index: &str, doc_type: &str) -> String {
    format!("{index}/{doc_type}")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
