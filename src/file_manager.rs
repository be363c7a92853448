//! # File Management Module
//!
//! Questo modulo collega la directory di output su disco e l'asset graph in
//! memoria usato dall'host command-line.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di tutti i file nella directory di output
//! - Nomi degli asset relativi a quella directory, sempre separati da `/`
//! - Riscrittura in place degli asset minimizzati
//!
//! ## Esempio:
//! ```rust,ignore
//! let assets = FileManager::load_assets(&dist).await?;
//! plugin.on_optimize_assets(&assets, &diagnostics, cpus).await;
//! FileManager::write_minimized(&dist, &assets).await?;
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::asset::{Asset, AssetGraph, MemoryAssets};

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find every regular file below `root`, sorted by path.
    pub fn find_files(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }

    /// Asset name of `path` relative to `root`.
    pub fn asset_name(root: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// Load every file under `root` as an asset.
    pub async fn load_assets(root: &Path) -> Result<MemoryAssets> {
        let assets = MemoryAssets::new();

        for path in Self::find_files(root) {
            let Some(name) = Self::asset_name(root, &path) else {
                continue;
            };
            let content = fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            assets.insert(Asset::new(name, content));
        }

        debug!("Loaded {} assets from {}", assets.len(), root.display());
        Ok(assets)
    }

    /// Write every asset flagged minimized back below `root`. Returns how
    /// many files were written.
    pub async fn write_minimized(root: &Path, assets: &dyn AssetGraph) -> Result<usize> {
        let mut written = 0;

        for asset in assets.list_assets().into_iter().filter(|a| a.info.minimized) {
            let path = root.join(&asset.name);
            fs::write(&path, asset.content.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }

        Ok(written)
    }
}
