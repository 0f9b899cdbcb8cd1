//! Key/value persistence seam.
//!
//! Every player-facing module keeps its whole state in one JSON blob under a
//! namespaced key. Reads never fail on bad data: a blob that does not parse is
//! logged and replaced by the module default. Operations that touch several
//! blobs stage them in a [`WriteBatch`] so a failed write leaves none of them
//! changed.
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::address::Address;
use crate::constants::{GLOBAL_ACCOUNT, GUEST_ACCOUNT, STORAGE_PREFIX};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raw string storage, shaped after the browser `Storage` interface.
/// Platform crates provide the real backend.
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write (quota, access).
    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Delete the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), Self::Error>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    type Error = S::Error;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        (**self).remove_item(key)
    }
}

/// In-memory store. Clones share the same map, which mirrors how every
/// handle to `localStorage` sees the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Sorted list of stored keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Key namespace: `etherealm.<account>.<module>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    account: String,
}

impl Namespace {
    /// Namespace used before a wallet is connected.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            account: GUEST_ACCOUNT.to_string(),
        }
    }

    /// Namespace shared by all accounts on this device (leaderboard, guilds).
    #[must_use]
    pub fn global() -> Self {
        Self {
            account: GLOBAL_ACCOUNT.to_string(),
        }
    }

    #[must_use]
    pub fn for_account(address: &Address) -> Self {
        Self {
            account: address.to_string(),
        }
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    #[must_use]
    pub fn key(&self, module: &str) -> String {
        format!("{STORAGE_PREFIX}.{}.{module}", self.account)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::guest()
    }
}

/// Read and parse the blob under `key`, substituting `T::default()` when it
/// is missing, unreadable, or malformed.
pub fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            log::warn!("storage read failed for {key}: {err}");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("discarding malformed blob at {key}: {err}");
            T::default()
        }
    }
}

/// Serialize `value` and write it under `key`.
///
/// # Errors
///
/// Returns an error if serialization fails or the backend rejects the write.
pub fn save<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(value)?;
    store
        .set_item(key, &json)
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    if crate::debug_log_enabled() {
        log::debug!("saved {key} ({} bytes)", json.len());
    }
    Ok(())
}

/// Remove the blob under `key`.
///
/// # Errors
///
/// Returns an error if the backend rejects the delete.
pub fn clear<S>(store: &S, key: &str) -> Result<(), StorageError>
where
    S: KeyValueStore + ?Sized,
{
    store
        .remove_item(key)
        .map_err(|e| StorageError::Backend(e.to_string()))
}

fn write_raw<S>(store: &S, key: &str, value: Option<&str>) -> Result<(), StorageError>
where
    S: KeyValueStore + ?Sized,
{
    match value {
        Some(value) => store.set_item(key, value),
        None => store.remove_item(key),
    }
    .map_err(|e| StorageError::Backend(e.to_string()))
}

/// Serialized blobs written together or not at all.
///
/// Staging serializes immediately, so a blob that cannot be encoded fails
/// before anything touches the store. On commit the previous values are read
/// first; if a write fails, the keys already written are put back in reverse
/// order.
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<(String, Option<String>)>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn push(&mut self, key: String, value: Option<String>) {
        match self.writes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.writes.push((key, value)),
        }
    }

    /// Stage `blob` under `ns`. A later stage of the same key replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be serialized.
    pub fn stage<T: StoredBlob>(&mut self, ns: &Namespace, blob: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(blob)?;
        self.push(ns.key(T::KEY), Some(json));
        Ok(())
    }

    /// Stage the removal of `T`'s blob under `ns`.
    pub fn stage_clear<T: StoredBlob>(&mut self, ns: &Namespace) {
        self.push(ns.key(T::KEY), None);
    }

    /// Apply every staged write.
    ///
    /// # Errors
    ///
    /// Returns the first backend error. Earlier writes from this batch have
    /// been reverted by then, unless the revert itself failed (logged).
    pub fn commit<S: KeyValueStore + ?Sized>(self, store: &S) -> Result<(), StorageError> {
        let mut previous = Vec::with_capacity(self.writes.len());
        for (key, _) in &self.writes {
            previous.push(
                store
                    .get_item(key)
                    .map_err(|e| StorageError::Backend(e.to_string()))?,
            );
        }
        for (done, (key, value)) in self.writes.iter().enumerate() {
            if let Err(err) = write_raw(store, key, value.as_deref()) {
                log::warn!("write to {key} failed, reverting {done} earlier writes: {err}");
                for ((key, _), old) in self.writes[..done].iter().zip(&previous).rev() {
                    if let Err(undo) = write_raw(store, key, old.as_deref()) {
                        log::error!("could not revert {key}: {undo}");
                    }
                }
                return Err(err);
            }
        }
        if crate::debug_log_enabled() {
            log::debug!("committed {} blobs", self.writes.len());
        }
        Ok(())
    }
}

/// A module state persisted as a single blob under a fixed module key.
pub trait StoredBlob: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;

    fn load<S: KeyValueStore + ?Sized>(store: &S, ns: &Namespace) -> Self {
        load_or_default(store, &ns.key(Self::KEY))
    }

    /// Persist this blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be written.
    fn save<S: KeyValueStore + ?Sized>(&self, store: &S, ns: &Namespace) -> Result<(), StorageError> {
        save(store, &ns.key(Self::KEY), self)
    }

    /// Remove this blob so the next load yields the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    fn clear<S: KeyValueStore + ?Sized>(store: &S, ns: &Namespace) -> Result<(), StorageError> {
        clear(store, &ns.key(Self::KEY))
    }
}
