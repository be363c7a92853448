//! # Error Types Module
//!
//! Questo modulo definisce il tipo di errore condiviso dal motore di minimizzazione.
//!
//! ## Categorie di errori:
//! - `Config`, `UnknownMinimizer`, `InvalidRule`: errori di configurazione,
//!   sollevati durante la costruzione del plugin e fatali per il setup
//! - `Minimizer`: un'implementazione è fallita su un asset; porta con sé quanto
//!   prodotto da una catena prima dello stage fallito
//! - `WorkerSpawn`, `WorkerCrashed`, `WorkerGone`, `SpecSerialization`:
//!   errori di trasporto verso i worker, riportati sull'asset in volo
//! - `MissingAsset`: l'asset graph non contiene più l'asset da aggiornare
//! - `Cache`, `Io`, `Json`: errori dello store della cache
//!
//! Tutto ciò che segue `Config` viene intercettato dall'orchestratore al confine
//! del task e trasformato in un diagnostic; niente di questo interrompe un pass.
//!
//! ## Esempio:
//! ```rust,ignore
//! if registry.get(&step.implementation).is_none() {
//!     return Err(MinimizeError::UnknownMinimizer(step.implementation.clone()));
//! }
//! ```

use crate::minimizer::MinifyOutput;

/// Errors raised by the minimization engine
#[derive(thiserror::Error, Debug)]
pub enum MinimizeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown minimizer implementation: {0}")]
    UnknownMinimizer(String),

    #[error("Invalid rule pattern '{pattern}': {source}")]
    InvalidRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{source}")]
    Minimizer {
        /// Output accumulated by the stages that completed before the failure.
        partial: Box<MinifyOutput>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Worker crashed while minimizing {0}")]
    WorkerCrashed(String),

    #[error("Worker pool is shut down")]
    WorkerGone,

    #[error("Failed to serialize minimizer spec: {0}")]
    SpecSerialization(String),

    #[error("Asset not found: {0}")]
    MissingAsset(String),

    #[error("Cache store error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MinimizeError {
    /// Wrap an implementation failure, keeping the chained output produced so far.
    pub fn minimizer(source: anyhow::Error, partial: MinifyOutput) -> Self {
        Self::Minimizer {
            partial: Box::new(partial),
            source: source.into(),
        }
    }

    /// True for errors that must stop plugin construction.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::UnknownMinimizer(_) | Self::InvalidRule { .. }
        )
    }

    /// Warnings and errors a failed chain had already collected.
    pub fn partial_output(&self) -> Option<&MinifyOutput> {
        match self {
            Self::Minimizer { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MinimizeError>;

/// Text carried by a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
