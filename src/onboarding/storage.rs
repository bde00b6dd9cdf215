//! Durable session storage.
//!
//! The session is written as one named JSON record
//! `{currentStep, formData, draftId}`. Two backends: a directory of JSON
//! files for real use and an in-memory map for tests.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use super::state::OnboardingSession;
use crate::error::StorageError;

/// Backend-agnostic persistence for the wizard session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the record stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<OnboardingSession>, StorageError>;

    /// Overwrite the record stored under `key`.
    async fn save(&self, key: &str, session: &OnboardingSession) -> Result<(), StorageError>;

    /// Remove the record stored under `key`. Missing records are not an error.
    async fn clear(&self, key: &str) -> Result<(), StorageError>;
}

/// Reject keys that would escape the storage directory.
fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Stores each record as `<dir>/<key>.json`.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Path of the record stored under `key`.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<OnboardingSession>, StorageError> {
        check_key(key)?;
        let path = self.record_path(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn save(&self, key: &str, session: &OnboardingSession) -> Result<(), StorageError> {
        check_key(key)?;
        fs::create_dir_all(&self.base_path).await?;
        let json = serde_json::to_string_pretty(session)?;

        // Write then rename so a crash never leaves a half-written record.
        let path = self.record_path(key);
        let tmp = self.base_path.join(format!("{key}.json.tmp"));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage. Records are kept as serialized JSON so the same
/// boundary is exercised as with files.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON stored under `key`.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.records.read().await.get(key).cloned()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<OnboardingSession>, StorageError> {
        let records = self.records.read().await;
        match records.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, session: &OnboardingSession) -> Result<(), StorageError> {
        let json = serde_json::to_string(session)?;
        self.records.write().await.insert(key.to_string(), json);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}
