//! # HTML Minimizer Library
//!
//! Stage di ottimizzazione degli asset per pipeline di build: riscrive gli
//! asset HTML prodotti in forma minimizzata, evita il lavoro già fatto tramite
//! una result cache indicizzata per contenuto e distribuisce la minimizzazione
//! CPU-bound su un worker pool limitato.
//!
//! ## Responsabilità:
//! - Selezione degli asset da processare (regole `test`/`include`/`exclude`)
//! - Deduplica del lavoro con una cache basata sul fingerprint del contenuto
//! - Scelta tra minimizzazione inline e worker pool avviato on demand
//! - Throttling dei task concorrenti entro un limite
//! - Raccolta di errori e warning per asset senza interrompere il pass
//!
//! ## Architettura dei moduli:
//! - `config`: opzioni del plugin e validazione
//! - `error`: tipi di errore per configurazione, minimizer e trasporto worker
//! - `rules`: matching dei nomi degli asset
//! - `minimizer`: trait, registry, spec e il minimizer `html` incluso
//! - `cache`: fingerprint, handle della cache e store
//! - `throttle`: runner di task a concorrenza limitata
//! - `worker`: thread worker e la loro creazione lazy single-flight
//! - `optimizer`: l'orchestratore del pass
//! - `asset`, `diagnostics`: i collaboratori host con cui parla il pass
//! - `file_manager`, `progress`: supporto per l'host command-line
//!
//! ## Esempio di utilizzo:
//! ```rust,ignore
//! use html_minimizer::{Config, Diagnostics, HtmlMinimizerPlugin, MemoryCacheStore, MinimizerRegistry};
//!
//! let plugin = HtmlMinimizerPlugin::new(
//!     &Config::default(),
//!     MinimizerRegistry::with_builtin(),
//!     Arc::new(MemoryCacheStore::new()),
//! )?;
//! let diagnostics = Diagnostics::new();
//! let report = plugin.on_optimize_assets(&assets, &diagnostics, num_cpus).await;
//! ```

pub mod asset;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod file_manager;
pub mod minimizer;
pub mod optimizer;
pub mod progress;
pub mod rules;
pub mod throttle;
pub mod worker;

pub use asset::{Asset, AssetContent, AssetGraph, AssetInfo, MemoryAssets};
pub use cache::{CacheStore, FileCacheStore, Fingerprint, MemoryCacheStore, ResultCache};
pub use config::{Config, Parallel};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::MinimizeError;
pub use minimizer::{MinifyOutput, Minimizer, MinimizerRegistry, MinimizerSpec};
pub use optimizer::{HtmlMinimizerPlugin, PassReport};
