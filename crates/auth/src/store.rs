// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence keyed by server URI.
//!
//! The request path never fails because of the store: every caller logs
//! store errors and carries on as if nothing was stored.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::credential::Credential;

/// Store failure. Never fatal to a request.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    /// The backing file exists but does not parse.
    Corrupt(String),
    /// The URI has no host and cannot key an entry.
    InvalidKey(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "credential store i/o error: {e}"),
            Self::Corrupt(msg) => write!(f, "credential store is corrupt: {msg}"),
            Self::InvalidKey(uri) => write!(f, "cannot key credentials by uri: {uri}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Persistent credential storage. Implementations serialize their own writes.
pub trait CredentialStore: Send + Sync {
    fn get(&self, server: &Url) -> Result<Option<Credential>, StoreError>;
    fn set(&self, server: &Url, credential: &Credential) -> Result<(), StoreError>;
    fn remove(&self, server: &Url) -> Result<(), StoreError>;
    /// Whether credentials survive the process (drives the "save password" offer).
    fn can_persist(&self) -> bool;
}

/// Normalised entry key: `scheme://host:port/path` without a trailing slash.
pub fn store_key(server: &Url) -> Result<String, StoreError> {
    let host = server.host_str().ok_or_else(|| StoreError::InvalidKey(server.to_string()))?;
    let port = server.port_or_known_default().unwrap_or(0);
    let path = server.path().trim_end_matches('/');
    Ok(format!(
        "{}://{}:{}{}",
        server.scheme().to_ascii_lowercase(),
        host.to_ascii_lowercase(),
        port,
        path
    ))
}

/// In-process store. Credentials are lost on exit, so it cannot persist.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, server: &Url) -> Result<Option<Credential>, StoreError> {
        Ok(self.entries.lock().get(&store_key(server)?).cloned())
    }

    fn set(&self, server: &Url, credential: &Credential) -> Result<(), StoreError> {
        self.entries.lock().insert(store_key(server)?, credential.clone());
        Ok(())
    }

    fn remove(&self, server: &Url) -> Result<(), StoreError> {
        self.entries.lock().remove(&store_key(server)?);
        Ok(())
    }

    fn can_persist(&self) -> bool {
        false
    }
}

/// On-disk layout of [`FileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    servers: HashMap<String, Credential>,
}

/// JSON file store with atomic writes.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreFile::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Write tmp + rename. The tmp name is unique per process and call so
    /// concurrent saves never interleave bytes in the same file.
    fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json =
            serde_json::to_string_pretty(file).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        restrict_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl CredentialStore for FileStore {
    fn get(&self, server: &Url) -> Result<Option<Credential>, StoreError> {
        let key = store_key(server)?;
        Ok(self.load()?.servers.remove(&key))
    }

    fn set(&self, server: &Url, credential: &Credential) -> Result<(), StoreError> {
        let key = store_key(server)?;
        let _guard = self.write.lock();
        let mut file = self.load()?;
        file.servers.insert(key, credential.clone());
        self.save(&file)
    }

    fn remove(&self, server: &Url) -> Result<(), StoreError> {
        let key = store_key(server)?;
        let _guard = self.write.lock();
        let mut file = self.load()?;
        if file.servers.remove(&key).is_some() {
            self.save(&file)?;
        }
        Ok(())
    }

    fn can_persist(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
