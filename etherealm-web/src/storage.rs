//! `localStorage` backend for the core storage seam.
use etherealm_game::KeyValueStore;
use web_sys::Storage;

use crate::dom;

#[derive(Debug, thiserror::Error)]
pub enum WebStorageError {
    #[error("localStorage unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Handle to `window.localStorage`. Cheap to clone; every clone sees the
/// same origin-wide storage.
#[derive(Debug, Clone)]
pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    /// Bind to the current window's `localStorage`.
    ///
    /// # Errors
    /// Returns `Unavailable` outside a browser or when storage access is denied.
    pub fn new() -> Result<Self, WebStorageError> {
        dom::local_storage()
            .map(|storage| Self { storage })
            .map_err(|err| WebStorageError::Unavailable(dom::js_error_message(&err)))
    }

    /// Keys currently stored under `prefix`, in storage order.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be enumerated.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, WebStorageError> {
        let len = self.storage.length().map_err(storage_error)?;
        let mut keys = Vec::new();
        for index in 0..len {
            if let Some(key) = self.storage.key(index).map_err(storage_error)?
                && key.starts_with(prefix)
            {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

fn storage_error(err: wasm_bindgen::JsValue) -> WebStorageError {
    WebStorageError::Storage(dom::js_error_message(&err))
}

impl KeyValueStore for LocalStore {
    type Error = WebStorageError;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        self.storage.get_item(key).map_err(storage_error)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.storage.set_item(key, value).map_err(storage_error)
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        self.storage.remove_item(key).map_err(storage_error)
    }
}
