//! Key/value persistence and the typed records kept on top of it.
//!
//! Every record is a JSON blob under a fixed key. Reads that fail, for
//! whatever reason, come back as "absent" so the engine always has a default
//! to fall back to.

use crate::config::{keys, HISTORY_LIMIT};
use crate::lock::LockState;
use crate::{DecisionError, HistoryEntry, SavedWheel, UserProfile};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use wasm_bindgen::JsValue;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DecisionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DecisionError>;
    fn delete(&self, key: &str) -> Result<(), DecisionError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, DecisionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DecisionError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), DecisionError> {
        (**self).delete(key)
    }
}

/// Process-lifetime store. Used in tests and when `localStorage` is blocked.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DecisionError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DecisionError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), DecisionError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// The browser's `window.localStorage`. Only usable on wasm32.
pub struct BrowserStore {
    storage: web_sys::Storage,
}

fn js_error(err: JsValue) -> DecisionError {
    DecisionError::PersistenceUnavailable(format!("{:?}", err))
}

impl BrowserStore {
    pub fn open() -> Result<Self, DecisionError> {
        let window = web_sys::window()
            .ok_or_else(|| DecisionError::PersistenceUnavailable("no window".into()))?;
        let storage = window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| DecisionError::PersistenceUnavailable("localStorage disabled".into()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, DecisionError> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DecisionError> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn delete(&self, key: &str) -> Result<(), DecisionError> {
        self.storage.remove_item(key).map_err(js_error)
    }
}

/// Typed access to the profile, saved wheels, history and lock records.
pub struct Records<S> {
    store: S,
}

impl<S: KeyValueStore> Records<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("Reading '{}' failed, treating as empty: {}", key, err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Discarding unreadable '{}' record: {}", key, err);
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Could not encode '{}': {}", key, err);
                return;
            }
        };
        if let Err(err) = self.store.set(key, &raw) {
            warn!("Writing '{}' failed: {}", key, err);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.store.delete(key) {
            warn!("Deleting '{}' failed: {}", key, err);
        }
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.read(keys::PROFILE)
    }

    pub fn save_profile(&self, profile: &UserProfile) {
        self.write(keys::PROFILE, profile);
    }

    pub fn saved_wheels(&self) -> Vec<SavedWheel> {
        self.read(keys::SAVED_WHEELS).unwrap_or_default()
    }

    /// Newest first. Returns the updated list.
    pub fn save_wheel(&self, wheel: SavedWheel) -> Vec<SavedWheel> {
        let mut wheels = self.saved_wheels();
        wheels.insert(0, wheel);
        self.write(keys::SAVED_WHEELS, &wheels);
        wheels
    }

    pub fn delete_wheel(&self, id: &str) -> Vec<SavedWheel> {
        let mut wheels = self.saved_wheels();
        wheels.retain(|w| w.id != id);
        self.write(keys::SAVED_WHEELS, &wheels);
        wheels
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read(keys::HISTORY).unwrap_or_default()
    }

    /// Newest first, keeping at most [`HISTORY_LIMIT`] entries.
    pub fn push_history(&self, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let mut history = self.history();
        history.insert(0, entry);
        history.truncate(HISTORY_LIMIT);
        self.write(keys::HISTORY, &history);
        history
    }

    pub fn clear_history(&self) {
        self.remove(keys::HISTORY);
    }

    pub fn lock(&self) -> Option<LockState> {
        self.read(keys::LOCK)
    }

    pub fn save_lock(&self, lock: &LockState) {
        self.write(keys::LOCK, lock);
    }

    pub fn clear_lock(&self) {
        self.remove(keys::LOCK);
    }
}
