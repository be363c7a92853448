//! # Asset Graph Module
//!
//! Questo modulo modella gli asset prodotti dalla build host, per quanto serve al minimizer.
//!
//! ## Strutture dati:
//! - `Asset`: nome, contenuto e info bag di un file prodotto
//! - `AssetGraph`: il collaboratore che l'orchestratore elenca, legge e aggiorna
//! - `MemoryAssets`: graph in memoria che mantiene l'ordine di discovery
//!
//! L'orchestratore legge solo le entry e le sostituisce per intero; non
//! aggiunge né rimuove mai asset.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::error::{MinimizeError, Result};

/// Raw asset content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetContent {
    Text(String),
    Binary(Vec<u8>),
}

impl AssetContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Content as text; binary buffers are decoded as lossy UTF-8.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for AssetContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for AssetContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for AssetContent {
    fn from(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Binary(err.into_bytes()),
        }
    }
}

/// Metadata bag attached to an asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    #[serde(default)]
    pub minimized: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A produced build asset
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub name: String,
    pub content: AssetContent,
    pub info: AssetInfo,
}

impl Asset {
    pub fn new(name: impl Into<String>, content: impl Into<AssetContent>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            info: AssetInfo::default(),
        }
    }

    pub fn with_info(mut self, info: AssetInfo) -> Self {
        self.info = info;
        self
    }
}

/// Access to the host's asset set
pub trait AssetGraph: Send + Sync {
    /// Snapshot of every asset in discovery order.
    fn list_assets(&self) -> Vec<Asset>;

    fn get_asset(&self, name: &str) -> Option<Asset>;

    /// Replace the content and info of an existing asset.
    fn update_asset(&self, name: &str, content: AssetContent, info: AssetInfo) -> Result<()>;
}

#[derive(Debug, Default)]
struct Inner {
    order: Vec<String>,
    assets: HashMap<String, Asset>,
}

/// In-memory asset graph
#[derive(Debug, Default)]
pub struct MemoryAssets {
    inner: RwLock<Inner>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, replacing any asset with the same name in place.
    pub fn insert(&self, asset: Asset) {
        let mut inner = self.inner.write();
        if !inner.assets.contains_key(&asset.name) {
            inner.order.push(asset.name.clone());
        }
        inner.assets.insert(asset.name.clone(), asset);
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Asset> for MemoryAssets {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let assets = Self::new();
        for asset in iter {
            assets.insert(asset);
        }
        assets
    }
}

impl AssetGraph for MemoryAssets {
    fn list_assets(&self) -> Vec<Asset> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| inner.assets.get(name).cloned())
            .collect()
    }

    fn get_asset(&self, name: &str) -> Option<Asset> {
        self.inner.read().assets.get(name).cloned()
    }

    fn update_asset(&self, name: &str, content: AssetContent, info: AssetInfo) -> Result<()> {
        let mut inner = self.inner.write();
        let asset = inner
            .assets
            .get_mut(name)
            .ok_or_else(|| MinimizeError::MissingAsset(name.to_string()))?;
        asset.content = content;
        asset.info = info;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_assets_keep_discovery_order() {
        let assets: MemoryAssets = ["b.html", "a.html", "c.css"]
            .into_iter()
            .map(|name| Asset::new(name, "x"))
            .collect();
        assets.insert(Asset::new("a.html", "replaced"));

        let names: Vec<_> = assets.list_assets().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["b.html", "a.html", "c.css"]);
        assert_eq!(assets.get_asset("a.html").unwrap().content, AssetContent::from("replaced"));
    }

    #[test]
    fn test_update_requires_existing_asset() {
        let assets = MemoryAssets::new();
        let err = assets
            .update_asset("ghost.html", "x".into(), AssetInfo::default())
            .unwrap_err();
        assert!(matches!(err, MinimizeError::MissingAsset(name) if name == "ghost.html"));
    }

    #[test]
    fn test_binary_content_decodes_lossily() {
        let content = AssetContent::from(vec![b'<', b'p', b'>', 0xff]);
        assert!(matches!(content, AssetContent::Binary(_)));
        assert_eq!(content.to_text(), "<p>\u{fffd}");

        let text = AssetContent::from(b"<p>".to_vec());
        assert_eq!(text, AssetContent::Text("<p>".into()));
    }

    #[test]
    fn test_info_keeps_extra_fields() {
        let info: AssetInfo = serde_json::from_value(json!({
            "minimized": false,
            "immutable": true
        }))
        .unwrap();
        assert!(!info.minimized);
        assert_eq!(info.extra.get("immutable"), Some(&json!(true)));
    }
}
