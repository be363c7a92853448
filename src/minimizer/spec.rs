//! Configurazione del minimizer e `MinimizerSpec` risolta.
//!
//! L'utente configura `{ implementation, options }`, dove ciascun lato può
//! essere un valore singolo o una lista. Una lista di implementazioni forma una
//! catena; una lista di opzioni viene abbinata elemento per elemento, un valore
//! singolo di opzioni è condiviso da tutti gli stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{MinimizeError, Result};
use crate::minimizer::html;

/// One value or a list of values.
///
/// `Many` is tried first so that a JSON array of option objects is not
/// swallowed whole by a `One(Value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }
}

/// User-facing `minimizer` option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerConfig {
    /// Registry name(s) of the implementation(s) to run
    pub implementation: OneOrMany<String>,
    /// Options for every stage, or one options value per stage
    #[serde(default = "default_options")]
    pub options: OneOrMany<Value>,
}

fn default_options() -> OneOrMany<Value> {
    OneOrMany::One(Value::Object(Default::default()))
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            implementation: OneOrMany::One(html::NAME.to_string()),
            options: default_options(),
        }
    }
}

impl MinimizerConfig {
    /// Build the immutable spec used for the plugin's lifetime.
    pub fn build(&self) -> Result<MinimizerSpec> {
        match &self.implementation {
            OneOrMany::One(implementation) => {
                let options = match &self.options {
                    OneOrMany::One(options) => options.clone(),
                    OneOrMany::Many(_) => {
                        return Err(MinimizeError::Config(
                            "an options list requires a list of implementations".to_string(),
                        ))
                    }
                };
                Ok(MinimizerSpec::Single(MinimizerStep::new(implementation.clone(), options)))
            }
            OneOrMany::Many(implementations) => {
                if implementations.is_empty() {
                    return Err(MinimizeError::Config(
                        "minimizer implementation list is empty".to_string(),
                    ));
                }
                if let OneOrMany::Many(options) = &self.options {
                    if options.len() != implementations.len() {
                        return Err(MinimizeError::Config(format!(
                            "{} implementations but {} option sets",
                            implementations.len(),
                            options.len()
                        )));
                    }
                }

                let steps = implementations
                    .iter()
                    .enumerate()
                    .map(|(index, implementation)| {
                        let options = match &self.options {
                            OneOrMany::One(options) => options.clone(),
                            OneOrMany::Many(options) => options[index].clone(),
                        };
                        MinimizerStep::new(implementation.clone(), options)
                    })
                    .collect();
                Ok(MinimizerSpec::Chain(steps))
            }
        }
    }
}

/// One implementation applied with one set of options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerStep {
    pub implementation: String,
    pub options: Value,
}

impl MinimizerStep {
    pub fn new(implementation: impl Into<String>, options: Value) -> Self {
        Self {
            implementation: implementation.into(),
            options,
        }
    }
}

/// Resolved minimizer description, shared read-only by every task of a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "steps", rename_all = "snake_case")]
pub enum MinimizerSpec {
    Single(MinimizerStep),
    Chain(Vec<MinimizerStep>),
}

impl MinimizerSpec {
    pub fn steps(&self) -> &[MinimizerStep] {
        match self {
            Self::Single(step) => std::slice::from_ref(step),
            Self::Chain(steps) => steps,
        }
    }

    /// Stable digest of the spec, folded into cache keys so that changing
    /// implementations or options invalidates earlier results.
    pub fn identity(&self) -> Result<String> {
        let encoded = serde_json::to_vec(self).map_err(|e| MinimizeError::SpecSerialization(e.to_string()))?;
        let digest = Sha256::digest(&encoded);
        Ok(hex::encode(digest)[..16].to_string())
    }
}
