//! # Minimizer Module
//!
//! Questo modulo raccoglie le implementazioni pluggable dei minimizer e il codice che le esegue.
//!
//! - `spec`: `MinimizerSpec`, la descrizione serializzabile di quali
//!   implementazioni applicare e con quali opzioni
//! - `html`: il minimizer HTML incluso, registrato come `"html"`
//! - `invoke`: esegue una spec singola o a catena su un input
//!
//! Le implementazioni sono referenziate da un nome stabile nel registry, così
//! una spec attraversa il confine dei worker come dato puro e viene risolta di
//! nuovo dall'altra parte.

pub mod html;
pub mod invoke;
pub mod spec;

pub use invoke::minify;
pub use spec::{MinimizerConfig, MinimizerSpec, MinimizerStep, OneOrMany};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MinimizeError, Result};

/// Result of running one or more minimizer stages over an input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifyOutput {
    pub code: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl MinifyOutput {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

/// A text minimizer.
///
/// `name` is the asset being processed and is only used for diagnostics.
/// Returning `Err` marks the asset as failed; reporting entries in
/// `MinifyOutput::errors` records them without throwing.
pub trait Minimizer: Send + Sync {
    fn minify(&self, name: &str, input: &str, options: &Value) -> anyhow::Result<MinifyOutput>;
}

impl<F> Minimizer for F
where
    F: Fn(&str, &str, &Value) -> anyhow::Result<MinifyOutput> + Send + Sync,
{
    fn minify(&self, name: &str, input: &str, options: &Value) -> anyhow::Result<MinifyOutput> {
        self(name, input, options)
    }
}

/// Maps stable implementation names to minimizers
#[derive(Clone, Default)]
pub struct MinimizerRegistry {
    implementations: HashMap<String, Arc<dyn Minimizer>>,
}

impl MinimizerRegistry {
    /// Empty registry with no implementations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundled minimizers.
    pub fn with_builtin() -> Self {
        Self::new().with(html::NAME, html::HtmlMinimizer)
    }

    pub fn with(mut self, name: impl Into<String>, minimizer: impl Minimizer + 'static) -> Self {
        self.register(name, minimizer);
        self
    }

    /// Register a plain function or closure as a minimizer.
    pub fn with_fn<F>(self, name: impl Into<String>, minimizer: F) -> Self
    where
        F: Fn(&str, &str, &Value) -> anyhow::Result<MinifyOutput> + Send + Sync + 'static,
    {
        self.with(name, minimizer)
    }

    pub fn register(&mut self, name: impl Into<String>, minimizer: impl Minimizer + 'static) {
        self.implementations.insert(name.into(), Arc::new(minimizer));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Minimizer>> {
        self.implementations.get(name).cloned()
    }

    /// Check that every step of `spec` names a registered implementation.
    pub fn resolve(&self, spec: &MinimizerSpec) -> Result<()> {
        for step in spec.steps() {
            if !self.implementations.contains_key(&step.implementation) {
                return Err(MinimizeError::UnknownMinimizer(step.implementation.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MinimizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.implementations.keys().collect();
        names.sort();
        f.debug_struct("MinimizerRegistry")
            .field("implementations", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_registry_resolves_default_spec() {
        let registry = MinimizerRegistry::with_builtin();
        let spec = MinimizerConfig::default().build().unwrap();
        assert!(registry.resolve(&spec).is_ok());
        assert!(registry.get("html").is_some());
    }

    #[test]
    fn test_resolve_rejects_unknown_names() {
        let registry = MinimizerRegistry::with_builtin();
        let spec = MinimizerSpec::Chain(vec![
            MinimizerStep::new("html", json!({})),
            MinimizerStep::new("swc", json!({})),
        ]);
        match registry.resolve(&spec) {
            Err(MinimizeError::UnknownMinimizer(name)) => assert_eq!(name, "swc"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_closures_are_minimizers() {
        let registry = MinimizerRegistry::new().with_fn("upper", |_, input, _| {
            Ok(MinifyOutput::code(input.to_uppercase()))
        });
        let upper = registry.get("upper").unwrap();
        let out = upper.minify("a.html", "<p>", &Value::Null).unwrap();
        assert_eq!(out.code, "<P>");
    }
}
