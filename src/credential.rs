//! Cached API credential
//!
//! The video analysis needs a YouTube API key. It is looked up in a
//! [`CredentialStore`] first; when missing, the user is prompted once and the
//! answer is cached for every later analysis. There is no expiry.

use crate::db::DbError;
use crate::screen::Screen;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Fixed storage key for the YouTube API key
pub const API_KEY_SLOT: &str = "yt_api_key";

pub const PROMPT_API_KEY: &str = "Enter your YouTube API key:";
pub const ALERT_API_KEY_REQUIRED: &str = "API key is required.";

/// Key/value storage for raw credential strings
pub trait CredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>, DbError>;

    fn save(&self, key: &str, value: &str) -> Result<(), DbError>;

    /// Returns whether a value was removed
    fn remove(&self, key: &str) -> Result<bool, DbError>;
}

/// Process-local store, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, DbError> {
        let values = self.values.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), DbError> {
        let mut values = self.values.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, DbError> {
        let mut values = self.values.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(values.remove(key).is_some())
    }
}

/// Cache a key supplied up front.
///
/// When `store` refuses the write, the key lives on in a fresh
/// [`MemoryStore`] for this run only.
pub fn store_supplied_key(store: Box<dyn CredentialStore>, key: &str) -> Box<dyn CredentialStore> {
    match store.save(API_KEY_SLOT, key) {
        Ok(()) => store,
        Err(e) => {
            warn!("failed to cache API key, using it for this run only: {}", e);
            let memory = MemoryStore::new();
            // A fresh MemoryStore only fails on a poisoned lock
            let _ = memory.save(API_KEY_SLOT, key);
            Box::new(memory)
        }
    }
}

/// Cached key, or prompt for one and cache it.
///
/// Returns `None` (after alerting) when the user declines. A store that
/// cannot be read is treated as empty; a failed write only loses the cache.
pub fn resolve_api_key<S: Screen + ?Sized>(store: &dyn CredentialStore, screen: &mut S) -> Option<String> {
    match store.load(API_KEY_SLOT) {
        Ok(Some(key)) if !key.is_empty() => {
            debug!("using cached API key");
            return Some(key);
        }
        Ok(_) => {}
        Err(e) => warn!("credential store unreadable: {}", e),
    }

    let key = match screen.prompt(PROMPT_API_KEY) {
        Some(k) if !k.is_empty() => k,
        _ => {
            screen.alert(ALERT_API_KEY_REQUIRED);
            return None;
        }
    };

    if let Err(e) = store.save(API_KEY_SLOT, &key) {
        warn!("failed to cache API key: {}", e);
    }
    Some(key)
}
