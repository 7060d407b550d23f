use crate::db;
use crate::error::StoreError;
use crate::model::now_iso;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::Cell;
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    LessonInstances,
    ScheduleEntries,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::LessonInstances, Collection::ScheduleEntries];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::LessonInstances => "lesson_instances",
            Collection::ScheduleEntries => "schedule_entries",
        }
    }
}

/// Per-record object store. Every write replaces the whole record.
pub trait RecordStore {
    fn init(&self) -> Result<(), StoreError>;
    fn get(&self, collection: Collection, id: &str) -> Result<Option<serde_json::Value>, StoreError>;
    fn put(&self, collection: Collection, id: &str, record: &serde_json::Value) -> Result<(), StoreError>;
    /// `(id, record)` pairs of a collection, ordered by id.
    fn list(&self, collection: Collection) -> Result<Vec<(String, serde_json::Value)>, StoreError>;
    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;
}

/// Loose key/value slots kept beside the record collections.
pub trait SettingsStore {
    fn setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
    fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError>;
    fn clear_setting(&self, key: &str) -> Result<(), StoreError>;
}

pub fn load<T: DeserializeOwned>(
    store: &impl RecordStore,
    collection: Collection,
    id: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(collection, id)? {
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
        None => Ok(None),
    }
}

pub fn save<T: Serialize>(
    store: &impl RecordStore,
    collection: Collection,
    id: &str,
    record: &T,
) -> Result<(), StoreError> {
    store.put(collection, id, &serde_json::to_value(record)?)
}

pub fn load_all<T: DeserializeOwned>(
    store: &impl RecordStore,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    store
        .list(collection)?
        .into_iter()
        .map(|(_, v)| serde_json::from_value(v).map_err(StoreError::from))
        .collect()
}

pub struct SqliteRecordStore {
    conn: Connection,
    initialized: Cell<bool>,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            initialized: Cell::new(false),
        }
    }

    fn ready(&self) -> Result<&Connection, StoreError> {
        if self.initialized.get() {
            Ok(&self.conn)
        } else {
            Err(StoreError::NotInitialized)
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS records(
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY(collection, id)
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection)",
            [],
        )?;
        self.initialized.set(true);
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let conn = self.ready()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE collection = ? AND id = ?",
                (collection.as_str(), id),
                |r| r.get(0),
            )
            .optional()?;
        match body {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn put(&self, collection: Collection, id: &str, record: &serde_json::Value) -> Result<(), StoreError> {
        let conn = self.ready()?;
        conn.execute(
            "INSERT INTO records(collection, id, body, updated_at) VALUES(?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            (
                collection.as_str(),
                id,
                serde_json::to_string(record)?,
                now_iso(),
            ),
        )?;
        Ok(())
    }

    fn list(&self, collection: Collection) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        let conn = self.ready()?;
        let mut stmt =
            conn.prepare("SELECT id, body FROM records WHERE collection = ? ORDER BY id")?;
        let rows = stmt
            .query_map([collection.as_str()], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, body)| -> Result<_, StoreError> { Ok((id, serde_json::from_str(&body)?)) })
            .collect()
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let conn = self.ready()?;
        let n = conn.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            (collection.as_str(), id),
        )?;
        Ok(n > 0)
    }
}

impl SettingsStore for SqliteRecordStore {
    fn setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        db::settings_get_json(&self.conn, key)
    }

    fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        db::settings_set_json(&self.conn, key, value)
    }

    fn clear_setting(&self, key: &str) -> Result<(), StoreError> {
        db::settings_delete(&self.conn, key)
    }
}

/// Volatile store used by unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RefCell<BTreeMap<(Collection, String), serde_json::Value>>,
    settings: RefCell<HashMap<String, serde_json::Value>>,
    initialized: Cell<bool>,
}

#[cfg(test)]
impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<(), StoreError> {
        if self.initialized.get() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }
}

#[cfg(test)]
impl RecordStore for MemoryRecordStore {
    fn init(&self) -> Result<(), StoreError> {
        self.initialized.set(true);
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.ready()?;
        Ok(self
            .records
            .borrow()
            .get(&(collection, id.to_string()))
            .cloned())
    }

    fn put(&self, collection: Collection, id: &str, record: &serde_json::Value) -> Result<(), StoreError> {
        self.ready()?;
        self.records
            .borrow_mut()
            .insert((collection, id.to_string()), record.clone());
        Ok(())
    }

    fn list(&self, collection: Collection) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        self.ready()?;
        Ok(self
            .records
            .borrow()
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|((_, id), v)| (id.clone(), v.clone()))
            .collect())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        self.ready()?;
        Ok(self
            .records
            .borrow_mut()
            .remove(&(collection, id.to_string()))
            .is_some())
    }
}

#[cfg(test)]
impl SettingsStore for MemoryRecordStore {
    fn setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.settings.borrow().get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        self.settings
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn clear_setting(&self, key: &str) -> Result<(), StoreError> {
        self.settings.borrow_mut().remove(key);
        Ok(())
    }
}
