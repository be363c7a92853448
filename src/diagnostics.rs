//! Errori e warning raccolti durante un pass.
//!
//! Il sink è append-only e condiviso da tutti i task. Se gli errori registrati
//! facciano fallire la build lo decide l'host.

use parking_lot::Mutex;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

/// Name used to attribute diagnostics to this stage.
pub const PLUGIN_NAME: &str = "HtmlMinimizerPlugin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One recorded error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub asset: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };
        write!(f, "{} in {}: {}", label, self.asset, self.message)
    }
}

/// Append-only diagnostic sink
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&self, asset: &str, message: impl Into<String>) {
        self.push(asset, Severity::Error, message.into());
    }

    pub fn push_warning(&self, asset: &str, message: impl Into<String>) {
        self.push(asset, Severity::Warning, message.into());
    }

    fn push(&self, asset: &str, severity: Severity, message: String) {
        self.entries.lock().push(Diagnostic {
            asset: asset.to_string(),
            severity,
            message,
        });
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.filtered(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.filtered(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.lock().iter().any(|d| d.severity == Severity::Error)
    }

    fn filtered(&self, severity: Severity) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .cloned()
            .collect()
    }
}

/// Message for an error that stopped `asset` from being minimized.
///
/// The cause chain, when there is one, is appended below the message.
pub fn build_error(asset: &str, error: &(dyn StdError + 'static)) -> String {
    let mut message = format!("{asset} from {PLUGIN_NAME}\n{error}");
    let mut previous = error.to_string();
    let mut cause = error.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if text != previous {
            message.push_str("\n    caused by: ");
            message.push_str(&text);
        }
        previous = text;
        cause = inner.source();
    }
    message
}

/// Message for an error a minimizer reported without failing.
pub fn build_reported_error(asset: &str, error: &str) -> String {
    format!("{asset} from {PLUGIN_NAME}\n{error}")
}

pub fn build_warning(asset: &str, warning: &str) -> String {
    format!("{PLUGIN_NAME} warning in {asset}\n{warning}")
}
