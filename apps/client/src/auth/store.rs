//! Credential store: key/value storage for the session credentials.
//!
//! The trait mirrors a platform keychain: `get`, `set`, `delete` over a fixed
//! set of keys. Every operation holds the store's lock for its full duration,
//! so a key is never observed half-written.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

// ────────────────────────────────────────────────────────────────────────────
// Keys and values
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    UserId,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::UserId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "accessToken",
            CredentialKey::RefreshToken => "refreshToken",
            CredentialKey::UserId => "userId",
        }
    }
}

/// Access/refresh credential pair as exchanged with the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait
// ────────────────────────────────────────────────────────────────────────────

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;
    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: CredentialKey) -> Result<(), StoreError>;

    /// Overwrites both tokens; the user id is left alone.
    fn save_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        self.set(CredentialKey::AccessToken, &tokens.access_token)?;
        self.set(CredentialKey::RefreshToken, &tokens.refresh_token)
    }

    fn save_session(&self, tokens: &TokenPair, user_id: &str) -> Result<(), StoreError> {
        self.save_tokens(tokens)?;
        self.set(CredentialKey::UserId, user_id)
    }

    /// Deletes every credential. Attempts all keys before reporting an error.
    fn clear(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for key in CredentialKey::ALL {
            if let Err(e) = self.delete(key) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: &TokenPair) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.insert(CredentialKey::AccessToken, tokens.access_token.clone());
            entries.insert(CredentialKey::RefreshToken, tokens.refresh_token.clone());
        }
        store
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn delete(&self, key: CredentialKey) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// File-backed store
// ────────────────────────────────────────────────────────────────────────────

/// JSON file store used by the CLI.
///
/// Each mutation is a locked read-modify-write that lands through a temp file
/// and `rename`, so readers never see a truncated file. On unix the file is
/// created with mode 0600.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

type Entries = BTreeMap<CredentialKey, String>;

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(entries)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut Entries) -> bool) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        if f(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_entries()?.remove(&key))
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key, value.to_string());
            true
        })
    }

    fn delete(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.update(|entries| entries.remove(&key).is_some())
    }

    /// Removes the backing file without parsing it, so a corrupt file can
    /// still be wiped on logout.
    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[test]
    fn test_memory_store_set_get_delete() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(CredentialKey::UserId).unwrap(), None);

        store.set(CredentialKey::UserId, "u-1").unwrap();
        assert_eq!(store.get(CredentialKey::UserId).unwrap().as_deref(), Some("u-1"));

        store.delete(CredentialKey::UserId).unwrap();
        assert_eq!(store.get(CredentialKey::UserId).unwrap(), None);
    }

    #[test]
    fn test_save_tokens_keeps_user_id() {
        let store = MemoryCredentialStore::new();
        store.save_session(&pair("a1", "r1"), "u-1").unwrap();
        store.save_tokens(&pair("a2", "r2")).unwrap();

        assert_eq!(store.get(CredentialKey::AccessToken).unwrap().as_deref(), Some("a2"));
        assert_eq!(store.get(CredentialKey::RefreshToken).unwrap().as_deref(), Some("r2"));
        assert_eq!(store.get(CredentialKey::UserId).unwrap().as_deref(), Some("u-1"));
    }

    #[test]
    fn test_clear_removes_every_key() {
        let store = MemoryCredentialStore::with_tokens(&pair("a", "r"));
        store.set(CredentialKey::UserId, "u").unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/credentials.json"));
        assert_eq!(store.get(CredentialKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/credentials.json");

        FileCredentialStore::new(&path)
            .save_session(&pair("access", "refresh"), "user-9")
            .unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(
            reopened.get(CredentialKey::RefreshToken).unwrap().as_deref(),
            Some("refresh")
        );
        assert_eq!(reopened.get(CredentialKey::UserId).unwrap().as_deref(), Some("user-9"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"refreshToken\""), "keys are stored camelCase: {raw}");
    }

    #[test]
    fn test_file_store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save_session(&pair("a", "r"), "u").unwrap();
        store.clear().unwrap();
        for key in CredentialKey::ALL {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = FileCredentialStore::new(&path);
        assert!(matches!(
            store.get(CredentialKey::AccessToken),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_file_store_clear_wipes_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"{garbage").unwrap();
        let store = FileCredentialStore::new(&path);

        store.clear().unwrap();

        assert!(!path.exists());
        assert_eq!(store.get(CredentialKey::AccessToken).unwrap(), None);
        store.set(CredentialKey::AccessToken, "a").unwrap();
        assert_eq!(store.get(CredentialKey::AccessToken).unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_file_store_clear_without_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);
        store.set(CredentialKey::AccessToken, "a").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
