//! # Result Cache Module
//!
//! Questo modulo ricorda i risultati di minimizzazione già calcolati, indicizzati per contenuto.
//!
//! ## Protocollo:
//! 1. `Fingerprint::of(content)` calcola l'hash dei byte di un asset (SHA-256, hex)
//! 2. `ResultCache::item(name, fingerprint)` apre un handle per la coppia
//! 3. `read()` prima del calcolo; un hit viene riprodotto senza eseguire alcun minimizer
//! 4. `write()` dopo un calcolo riuscito
//! 5. Un risultato senza errori viene salvato anche sotto il fingerprint del
//!    proprio output, così un asset riscritto su disco e riletto è un hit
//!
//! Le entry non vengono mai modificate. Un cambio di contenuto produce un nuovo
//! fingerprint e quindi una nuova chiave; le entry obsolete restano allo store.
//!
//! ## Chiavi:
//! `"{spec identity}/{asset name}|{fingerprint}"`. La spec identity è un
//! digest della `MinimizerSpec` risolta: cambiare opzioni o implementazioni
//! non riproduce mai risultati ottenuti con quelle vecchie.
//!
//! ## Store:
//! - `MemoryCacheStore`: locale al processo, per pass ripetuti in stile watch
//! - `FileCacheStore`: file JSON nella cache directory dell'utente

pub mod file;
pub mod memory;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::minimizer::MinifyOutput;

/// Content hash used as cache lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Deterministic fingerprint of `content`.
    pub fn of(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0[..16])
    }
}

/// Stored outcome of one minimization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl From<MinifyOutput> for CacheEntry {
    fn from(output: MinifyOutput) -> Self {
        Self {
            content: output.code,
            warnings: output.warnings,
            errors: output.errors,
        }
    }
}

/// Backing storage for cache entries.
///
/// Implementations must tolerate concurrent access to distinct keys.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<()>;
}

/// Per-plugin view of a cache store
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Handle for the entry of `name` at `fingerprint`.
    pub fn item(&self, name: &str, fingerprint: &Fingerprint) -> CacheItem<'_> {
        CacheItem {
            store: self.store.as_ref(),
            key: format!("{}/{}|{}", self.namespace, name, fingerprint.as_str()),
        }
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Read-before-compute / write-after-compute handle for one asset
pub struct CacheItem<'a> {
    store: &'a dyn CacheStore,
    key: String,
}

impl CacheItem<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn read(&self) -> Result<Option<CacheEntry>> {
        self.store.get(&self.key).await
    }

    pub async fn write(&self, entry: CacheEntry) -> Result<()> {
        self.store.store(&self.key, entry).await
    }
}
