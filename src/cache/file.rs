//! # File Cache Store
//!
//! Questo modulo persiste le entry della cache in un file JSON, così i risultati
//! sopravvivono tra un'esecuzione e l'altra.
//!
//! ## Strategia di persistence:
//! - Un file per directory di output, basato su hash del path
//! - Salvataggio in `<user cache dir>/html-minimizer/results_<hash>.json`
//! - Caricato una volta all'apertura, riscritto da `persist()`
//! - Un file corrotto o illeggibile fa partire una cache vuota
//!
//! ## Formato del file:
//! ```json
//! {
//!   "entries": {
//!     "3f9a.../index.html|9c1e...": {
//!       "content": "<p>hi</p>",
//!       "warnings": [],
//!       "errors": []
//!     }
//!   }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{CacheEntry, CacheStore};
use crate::error::{MinimizeError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, CacheEntry>,
}

/// JSON-file backed cache store
#[derive(Debug)]
pub struct FileCacheStore {
    path: PathBuf,
    state: RwLock<CacheFile>,
    dirty: AtomicBool,
}

impl FileCacheStore {
    /// Open the store for a build output directory under the user cache dir.
    pub async fn for_output_dir(output_dir: &Path) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| MinimizeError::Cache("Could not find cache directory".to_string()))?
            .join("html-minimizer");

        let mut hasher = Sha256::new();
        hasher.update(output_dir.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize())[..16].to_string();

        Self::open(cache_dir.join(format!("results_{}.json", hash))).await
    }

    /// Open (or start) the store at an explicit file path.
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let state = if path.exists() {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                CacheFile::default()
            })
        } else {
            CacheFile::default()
        };
        debug!("Opened cache {} ({} entries)", path.display(), state.entries.len());

        Ok(Self {
            path,
            state: RwLock::new(state),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Write pending entries to disk.
    pub async fn persist(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&*self.state.read().await)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.state.read().await.entries.get(key).cloned())
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.state.write().await.entries.insert(key.to_string(), entry);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }
}
