use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use mines_core::CredentialPicker;

/// API key shared between the analyzer and the credential picker.
#[derive(Clone, Default)]
pub struct KeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl KeyStore {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: Arc::new(RwLock::new(key.and_then(normalize))),
        }
    }

    pub fn from_env(var: &str) -> Self {
        let key = std::env::var(var).ok();
        if key.is_none() {
            log::debug!("{} is not set", var);
        }
        Self::new(key)
    }

    pub fn get(&self) -> Option<String> {
        match self.key.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, key: Option<String>) {
        let key = key.and_then(normalize);
        match self.key.write() {
            Ok(mut guard) => *guard = key,
            Err(poisoned) => *poisoned.into_inner() = key,
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("is_set", &self.is_set())
            .finish()
    }
}

fn normalize(key: String) -> Option<String> {
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

pub fn read_key_file(path: &Path) -> io::Result<Option<String>> {
    Ok(normalize(std::fs::read_to_string(path)?))
}

/// Picks credentials by re-reading a key file, so rotating the key needs no restart.
#[derive(Clone, Debug)]
pub struct FileKeyPicker {
    path: PathBuf,
    keys: KeyStore,
}

impl FileKeyPicker {
    pub fn new(path: PathBuf, keys: KeyStore) -> Self {
        Self { path, keys }
    }
}

impl CredentialPicker for FileKeyPicker {
    fn open(&self) -> BoxFuture<'static, ()> {
        let path = self.path.clone();
        let keys = self.keys.clone();
        async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    keys.set(Some(contents));
                    if keys.is_set() {
                        log::info!("Reloaded API key from {}", path.display());
                    } else {
                        log::warn!("{} holds no API key", path.display());
                    }
                }
                Err(err) => log::error!("Could not read {}: {}", path.display(), err),
            }
        }
        .boxed()
    }
}
