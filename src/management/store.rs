use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{config, error::Result, types::TokenRecord};

/// Keyed persistence of credentials and tokens.
///
/// Keys are account keys: the provider identity, followed by `#<user>` for
/// named accounts (see [`utils::account_key`](crate::utils::account_key)).
/// A manager reads its record once when it is constructed and writes it
/// after every successful exchange or refresh.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Reads the record stored under `key`.
    ///
    /// # Returns
    ///
    /// `None` when nothing is stored under the key.
    ///
    /// # Errors
    ///
    /// Implementations backed by files fail with [`AuthError::Io`] or
    /// [`AuthError::Serialization`] when the file cannot be read or parsed.
    ///
    /// [`AuthError::Io`]: crate::AuthError::Io
    /// [`AuthError::Serialization`]: crate::AuthError::Serialization
    async fn load(&self, key: &str) -> Result<Option<TokenRecord>>;

    /// Stores `record` under `key`, replacing any previous record.
    async fn save(&self, key: &str, record: TokenRecord) -> Result<()>;

    /// Removes a record, returning whether one existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    async fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    tokens: BTreeMap<String, TokenRecord>,
}

/// YAML-file token store.
///
/// The file is read once in [`YamlTokenStore::open`]; every change rewrites
/// the whole file through a temporary sibling that is renamed into place.
pub struct YamlTokenStore {
    path: PathBuf,
    tokens: Mutex<BTreeMap<String, TokenRecord>>,
}

impl YamlTokenStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens = match async_fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_yaml::from_str::<StoreFile>(&content)?.tokens,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            tokens: Mutex::new(tokens),
        })
    }

    /// Opens the store at [`config::token_store_path`].
    pub async fn open_default() -> Result<Self> {
        Self::open(config::token_store_path()).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, tokens: &BTreeMap<String, TokenRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                async_fs::create_dir_all(parent).await?;
            }
        }

        let file = StoreFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            tokens: tokens.clone(),
        };
        let yaml = serde_yaml::to_string(&file)?;

        let tmp = self.path.with_extension("yaml.tmp");
        async_fs::write(&tmp, yaml).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for YamlTokenStore {
    async fn load(&self, key: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, record: TokenRecord) -> Result<()> {
        // held across the write so concurrent saves cannot interleave
        let mut tokens = self.tokens.lock().await;
        tokens.insert(key.to_string(), record);
        self.write(&tokens).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut tokens = self.tokens.lock().await;
        if tokens.remove(key).is_none() {
            return Ok(false);
        }
        self.write(&tokens).await?;
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.tokens.lock().await.keys().cloned().collect())
    }
}

/// In-memory token store with no persistence across processes.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, key: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, record: TokenRecord) -> Result<()> {
        self.tokens.lock().await.insert(key.to_string(), record);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.tokens.lock().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.tokens.lock().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
