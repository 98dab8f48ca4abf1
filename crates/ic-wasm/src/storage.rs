//! `window.localStorage` as a key-value backend for the persisted record.

use crate::js_error;
use ic_core::persist::{KeyValueStore, PersistError};

pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Open the window's local storage. Fails in private modes that disable
    /// it and outside a browser window.
    pub fn open() -> Result<Self, PersistError> {
        let window = web_sys::window().ok_or_else(|| PersistError::Storage("no window".into()))?;
        let inner = window
            .local_storage()
            .map_err(|e| PersistError::Storage(js_error(e)))?
            .ok_or_else(|| PersistError::Storage("localStorage disabled".into()))?;
        Ok(Self { inner })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.inner
            .get_item(key)
            .map_err(|e| PersistError::Storage(js_error(e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.inner
            .set_item(key, value)
            .map_err(|e| PersistError::Storage(js_error(e)))
    }
}
