//! # Progress Feedback Module
//!
//! Feedback da terminale per l'host command-line, basato su `indicatif`.
//!
//! Dall'esterno un pass non ha un progresso per asset significativo (i task
//! terminano in qualsiasi ordine, i cache hit sono istantanei), quindi l'host
//! mostra uno spinner durante il pass e lo sostituisce con il riepilogo finale:
//!
//! ```text
//! ⠋ Minimizing 42 assets in dist/
//! ✓ Candidates: 42 | Minimized: 40 | Cache hits: 31 | Failed: 2 | Workers: 3 | Saved: 18.20 KB (12.41%)
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a pass runs
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Start a spinner with `message`.
    pub fn spinner(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Spinner that draws nothing, for `--json` output.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Stop the spinner, leaving `message` on screen.
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
