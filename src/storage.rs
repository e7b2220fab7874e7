use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::error;

use crate::errors::ClientError;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_ID_KEY: &str = "user_id";
pub const LAST_SESSION_KEY: &str = "last_session_id";

/// Small string key/value store for credentials and the last open session.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Bearer token for the HTTP API.
pub fn token(storage: &dyn Storage) -> Option<String> {
    storage.get(TOKEN_KEY).filter(|t| !t.is_empty())
}

/// Identity used for the streaming connection.
pub fn user_id(storage: &dyn Storage) -> Option<String> {
    storage.get(USER_ID_KEY).filter(|u| !u.is_empty())
}

pub fn save_login(storage: &dyn Storage, token: &str, user_id: &str) -> Result<(), ClientError> {
    storage.set(TOKEN_KEY, token)?;
    storage.set(USER_ID_KEY, user_id)
}

pub fn logout(storage: &dyn Storage) -> Result<(), ClientError> {
    storage.remove(TOKEN_KEY)?;
    storage.remove(USER_ID_KEY)
}

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.lock().clear();
        Ok(())
    }
}

/// Storage persisted as a single JSON object, rewritten on every change.
pub struct JsonFileStorage {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStorage {
    /// Opens `path`, starting empty if it does not exist or cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                error!("Ignoring unreadable storage file {}: {e}", path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self { path, values: Mutex::new(values) }
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), ClientError> {
        let mut values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = values.clone();
        f(&mut next);
        let json = serde_json::to_string_pretty(&next)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::storage(format!("create {}: {e}", parent.display()))
            })?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                error!("Failed to write storage file {}: {e}", self.path.display());
                ClientError::storage(format!("write {}: {e}", self.path.display()))
            })?;
        *values = next;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.update(HashMap::clear)
    }
}
