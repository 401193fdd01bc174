//! In-process store for exercising the engine without touching disk.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{RecordStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(String, String), Value>>,
    fail_list: AtomicBool,
    fail_updates: AtomicBool,
    updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, id: &str, record: Value) {
        self.records.lock().unwrap().insert((collection.to_string(), id.to_string()), record);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(&(collection.to_string(), id.to_string())).cloned()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of successful updates so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

fn injected() -> StoreError {
    StoreError::Io(std::io::Error::other("injected failure"))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        self.get(collection, id).ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&(collection.to_string(), id.to_string())) {
            Some(slot) => {
                *slot = record.clone();
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let key = (collection.to_string(), id.to_string());
        if records.contains_key(&key) {
            return Err(StoreError::already_exists(collection, id));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}
