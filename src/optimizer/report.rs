//! Statistiche del pass e formattazione human-readable di dimensioni e percentuali.

use serde::Serialize;

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// `bytes` scaled to the largest binary unit that keeps it at or above one,
/// e.g. `"512 B"` or `"2.00 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    let mut scaled = bytes as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit + 1 < BYTE_UNITS.len() {
        scaled /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{scaled:.2} {}", BYTE_UNITS[unit]),
    }
}

/// Share of `before` removed by shrinking it to `after`, in percent.
pub fn shrink_percent(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) * 100.0 / before as f64
}

/// How one scheduled asset ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Minimized { original_bytes: u64, minimized_bytes: u64 },
    Failed,
}

/// Summary of one optimize pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Assets that matched the rules and were not yet minimized
    pub candidates: usize,
    /// Matching assets skipped because they were already minimized
    pub skipped_minimized: usize,
    pub cache_hits: usize,
    /// Candidates that had to run a minimizer
    pub pending: usize,
    pub minimized: usize,
    pub failed: usize,
    pub workers: usize,
    pub throttle_limit: usize,
    pub pool_started: bool,
    pub original_bytes: u64,
    pub minimized_bytes: u64,
}

impl PassReport {
    pub fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Minimized {
                original_bytes,
                minimized_bytes,
            } => {
                self.minimized += 1;
                self.original_bytes += original_bytes;
                self.minimized_bytes += minimized_bytes;
            }
            TaskOutcome::Failed => self.failed += 1,
        }
    }

    pub fn bytes_saved(&self) -> u64 {
        self.original_bytes.saturating_sub(self.minimized_bytes)
    }

    pub fn reduction_percent(&self) -> f64 {
        shrink_percent(self.original_bytes, self.minimized_bytes)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Candidates: {} | Minimized: {} | Cache hits: {} | Failed: {} | Workers: {} | Saved: {} ({:.2}%)",
            self.candidates,
            self.minimized,
            self.cache_hits,
            self.failed,
            self.workers,
            format_bytes(self.bytes_saved()),
            self.reduction_percent()
        )
    }
}
