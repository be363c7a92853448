//! # Optimizer Module
//!
//! Lo stage di ottimizzazione, suddiviso in:
//! - `plugin`: orchestratore del pass (filtro, fase cache, sizing, throttle, teardown)
//! - `task`: worker per asset che applica un risultato all'asset graph
//! - `report`: statistiche del pass e formattazione di dimensioni

pub mod plugin;
pub mod report;
mod task;

pub use plugin::{HtmlMinimizerPlugin, MINIMIZED_LABEL};
pub use report::{format_bytes, shrink_percent, PassReport, TaskOutcome};
