//! # Configuration Management Module
//!
//! Questo modulo definisce le opzioni riconosciute dal plugin minimizer.
//!
//! ## Parametri:
//! - `test`: regola/e che il nome dell'asset deve rispettare (default: `.html` con query opzionale)
//! - `include`: regola/e che il nome deve rispettare in aggiunta (default: nessuna)
//! - `exclude`: regola/e che scartano il nome (default: nessuna)
//! - `minimizer`: nome/i dell'implementazione e opzioni (default: `html` incluso)
//! - `parallel`: `true` per `cores - 1` worker, un numero `n` per
//!   `min(n, cores - 1)`, valori non positivi o assenti per esecuzione inline
//!
//! ## Validazione:
//! - I pattern delle regole devono compilare
//! - Le liste di implementazioni e opzioni devono corrispondere
//!
//! ## Esempio:
//! ```json
//! {
//!   "exclude": { "regex": "^drafts/" },
//!   "minimizer": {
//!     "implementation": ["html", "html"],
//!     "options": [{ "remove_comments": false }, {}]
//!   },
//!   "parallel": 4
//! }
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MinimizeError;
use crate::minimizer::{MinimizerConfig, MinimizerSpec};
use crate::rules::{AssetFilter, Rules};

/// Worker pool request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parallel {
    Enabled(bool),
    Workers(i64),
}

impl Default for Parallel {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl Parallel {
    /// Number of cores the pass may hand to workers; 0 means run inline.
    pub fn available_cores(&self, cpu_count: usize) -> usize {
        let spare = cpu_count.saturating_sub(1);
        match *self {
            Self::Enabled(true) => spare,
            Self::Enabled(false) => 0,
            Self::Workers(n) if n <= 0 => 0,
            Self::Workers(n) => spare.min(n as usize),
        }
    }
}

/// Configuration for the minimizer plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Rules::default_test")]
    pub test: Rules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Rules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Rules>,
    #[serde(default)]
    pub minimizer: MinimizerConfig,
    #[serde(default)]
    pub parallel: Parallel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test: Rules::default_test(),
            include: None,
            exclude: None,
            minimizer: MinimizerConfig::default(),
            parallel: Parallel::default(),
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> std::result::Result<(), MinimizeError> {
        self.filter()?;
        self.spec()?;
        Ok(())
    }

    /// Compile the asset selection rules
    pub fn filter(&self) -> std::result::Result<AssetFilter, MinimizeError> {
        AssetFilter::new(&self.test, self.include.as_ref(), self.exclude.as_ref())
    }

    /// Resolve the minimizer option into its immutable spec
    pub fn spec(&self) -> std::result::Result<MinimizerSpec, MinimizeError> {
        self.minimizer.build()
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimizer::OneOrMany;
    use crate::rules::Rule;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.exclude = Some(OneOrMany::One(Rule::pattern("[")));
        assert!(config.validate().is_err());

        config.exclude = None;
        config.minimizer.implementation = OneOrMany::Many(vec!["html".into()]);
        config.minimizer.options = OneOrMany::Many(vec![json!({}), json!({})]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.parallel, Parallel::Enabled(false));
        assert!(config.include.is_none());
        assert!(config.filter().unwrap().matches("index.html"));
        assert_eq!(config.spec().unwrap().steps()[0].implementation, "html");
    }

    #[test]
    fn test_parallel_sizing() {
        assert_eq!(Parallel::Enabled(true).available_cores(4), 3);
        assert_eq!(Parallel::Enabled(false).available_cores(4), 0);
        assert_eq!(Parallel::Workers(2).available_cores(4), 2);
        assert_eq!(Parallel::Workers(16).available_cores(4), 3);
        assert_eq!(Parallel::Workers(0).available_cores(4), 0);
        assert_eq!(Parallel::Workers(-3).available_cores(4), 0);
        assert_eq!(Parallel::Enabled(true).available_cores(1), 0);
        assert_eq!(Parallel::Enabled(true).available_cores(0), 0);
    }

    #[test]
    fn test_parallel_deserializes_bool_or_number() {
        let config: Config = serde_json::from_value(json!({ "parallel": true })).unwrap();
        assert_eq!(config.parallel, Parallel::Enabled(true));
        let config: Config = serde_json::from_value(json!({ "parallel": 3 })).unwrap();
        assert_eq!(config.parallel, Parallel::Workers(3));
        let config: Config = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.parallel, Parallel::Enabled(false));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            exclude: Some(OneOrMany::One(Rule::Prefix("drafts/".into()))),
            parallel: Parallel::Workers(2),
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.parallel, Parallel::Workers(2));
        assert_eq!(loaded_config.exclude, original_config.exclude);
        assert_eq!(loaded_config.test, Rules::default_test());
        assert_eq!(loaded_config.minimizer, original_config.minimizer);
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.parallel, Parallel::default());
    }
}
