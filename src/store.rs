//! Session storage for the code verifier and tokens.
//!
//! The verifier has to survive the redirect to Spotify and back, and the
//! tokens are read by the poller on every tick. Both live behind the
//! [`SessionStore`] capability so callers can inject a test double.
//!
//! Values are plain strings with no expiry and no encryption. Tokens are
//! short-lived and read-only scoped; anything stronger belongs to a
//! different store implementation.

use std::{collections::HashMap, fs, io, path::PathBuf, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::{
    error::{Error, Result},
    pkce::CodeVerifier,
    types::TokenPair,
};

pub const CODE_VERIFIER_KEY: &str = "spotify_code_verifier";
pub const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
pub const REFRESH_TOKEN_KEY: &str = "spotify_refresh_token";

/// Synchronous key-value store scoped to one user profile.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, mostly useful for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Durable store backed by a single JSON file.
///
/// Nothing is cached: every `get` reads the file and every `set`/`remove`
/// reads, applies the change and writes the whole map back. Tokens stored by
/// `queuecard login` in another process are picked up on the next read.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    /// A missing file is treated as an empty store, a corrupt one is an error.
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
        }

        match async_fs::read_to_string(&path).await {
            Ok(content) => {
                parse_entries(&content)?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Storage(e.to_string())),
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_entries(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    // Written to a sibling file first so readers never see a partial map.
    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| Error::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::Storage(e.to_string()))
    }
}

fn parse_entries(content: &str) -> Result<HashMap<String, String>> {
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(content)
        .map_err(|e| Error::Storage(format!("corrupt session file: {}", e)))
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

pub fn save_code_verifier(store: &dyn SessionStore, verifier: &CodeVerifier) -> Result<()> {
    store.set(CODE_VERIFIER_KEY, verifier.as_str())
}

pub fn load_code_verifier(store: &dyn SessionStore) -> Result<Option<CodeVerifier>> {
    Ok(store
        .get(CODE_VERIFIER_KEY)?
        .filter(|v| !v.is_empty())
        .map(CodeVerifier::from))
}

/// Drops the verifier once it has been spent on an exchange.
pub fn consume_code_verifier(store: &dyn SessionStore) -> Result<()> {
    store.remove(CODE_VERIFIER_KEY)
}

/// Writes both tokens, overwriting any earlier login.
pub fn save_tokens(store: &dyn SessionStore, tokens: &TokenPair) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
    store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)
}

pub fn load_access_token(store: &dyn SessionStore) -> Result<Option<String>> {
    Ok(store.get(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty()))
}

pub fn load_refresh_token(store: &dyn SessionStore) -> Result<Option<String>> {
    Ok(store.get(REFRESH_TOKEN_KEY)?.filter(|t| !t.is_empty()))
}
