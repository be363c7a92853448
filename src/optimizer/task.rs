//! # Per-Asset Task
//!
//! Un task per ogni asset candidato. Il task riproduce la sua entry di cache
//! oppure esegue il minimizer (sul pool se il pass ne ha uno, inline
//! altrimenti), poi applica il risultato all'asset graph.
//!
//! Ogni fallimento si ferma a questo confine come diagnostic con il nome
//! dell'asset. Un asset fallito mantiene il suo contenuto e non viene marcato
//! come minimizzato.

use std::sync::Arc;
use tracing::{debug, error, warn};

use super::report::TaskOutcome;
use crate::asset::{Asset, AssetContent, AssetGraph};
use crate::cache::{CacheEntry, CacheItem, Fingerprint, ResultCache};
use crate::diagnostics::{build_error, build_reported_error, build_warning, Diagnostics};
use crate::error::{MinimizeError, Result};
use crate::minimizer::{self, MinifyOutput, MinimizerRegistry, MinimizerSpec};
use crate::worker::{LazyPool, WorkRequest};

/// An asset that survived filtering, with its cache lookup already done
pub(crate) struct Candidate<'a> {
    pub name: String,
    pub fingerprint: Fingerprint,
    pub item: CacheItem<'a>,
    pub cached: Option<CacheEntry>,
}

/// Where a cache miss gets minimized
pub(crate) enum Executor<'a> {
    Inline,
    Pool {
        pool: &'a LazyPool,
        /// Spec serialized once for the whole pass
        payload: &'a std::result::Result<Arc<str>, String>,
    },
}

/// Everything shared by the tasks of one pass
pub(crate) struct TaskContext<'a> {
    pub assets: &'a dyn AssetGraph,
    pub diagnostics: &'a Diagnostics,
    pub cache: &'a ResultCache,
    pub registry: &'a MinimizerRegistry,
    pub spec: &'a MinimizerSpec,
    pub executor: Executor<'a>,
}

impl TaskContext<'_> {
    pub async fn process(&self, candidate: Candidate<'_>) -> TaskOutcome {
        let Candidate {
            name,
            fingerprint,
            item,
            cached,
        } = candidate;

        let Some(asset) = self.assets.get_asset(&name) else {
            self.report_failure(&name, &MinimizeError::MissingAsset(name.clone()));
            return TaskOutcome::Failed;
        };

        let entry = match cached {
            Some(entry) => {
                debug!("Replaying cached result for {}", name);
                entry
            }
            None => {
                let input = asset.content.to_text();
                match self.minify(&name, &input).await {
                    Ok(output) => {
                        let entry = CacheEntry::from(output);
                        if let Err(e) = item.write(entry.clone()).await {
                            warn!("Failed to cache result for {}: {}", name, e);
                        }
                        self.remember_output(&name, &fingerprint, &entry).await;
                        entry
                    }
                    Err(e) => {
                        self.report_failure(&name, &e);
                        return TaskOutcome::Failed;
                    }
                }
            }
        };

        self.apply(asset, entry)
    }

    async fn minify(&self, name: &str, input: &str) -> Result<MinifyOutput> {
        match &self.executor {
            Executor::Inline => minimizer::minify(self.registry, name, input, self.spec),
            Executor::Pool { pool, payload } => {
                let spec = match payload {
                    Ok(spec) => Arc::clone(spec),
                    Err(e) => return Err(MinimizeError::SpecSerialization(e.clone())),
                };
                pool.minify(WorkRequest {
                    name: name.to_string(),
                    input: input.to_string(),
                    spec,
                })
                .await
            }
        }
    }

    /// Store a clean result under its own fingerprint too, so an asset that
    /// was written back and read again replays instead of running again.
    async fn remember_output(&self, name: &str, input: &Fingerprint, entry: &CacheEntry) {
        if !entry.errors.is_empty() {
            return;
        }
        let output = Fingerprint::of(entry.content.as_bytes());
        if &output == input {
            return;
        }

        let settled = CacheEntry {
            content: entry.content.clone(),
            warnings: Vec::new(),
            errors: Vec::new(),
        };
        if let Err(e) = self.cache.item(name, &output).write(settled).await {
            warn!("Failed to cache minimized output for {}: {}", name, e);
        }
    }

    fn apply(&self, asset: Asset, entry: CacheEntry) -> TaskOutcome {
        let name = asset.name.as_str();

        for warning in &entry.warnings {
            self.diagnostics.push_warning(name, build_warning(name, warning));
        }

        if !entry.errors.is_empty() {
            for reported in &entry.errors {
                self.diagnostics.push_error(name, build_reported_error(name, reported));
            }
            warn!("{} reported {} error(s), left unchanged", name, entry.errors.len());
            return TaskOutcome::Failed;
        }

        let original_bytes = asset.content.len() as u64;
        let minimized_bytes = entry.content.len() as u64;
        let mut info = asset.info.clone();
        info.minimized = true;

        match self
            .assets
            .update_asset(name, AssetContent::Text(entry.content), info)
        {
            Ok(()) => TaskOutcome::Minimized {
                original_bytes,
                minimized_bytes,
            },
            Err(e) => {
                self.report_failure(name, &e);
                TaskOutcome::Failed
            }
        }
    }

    fn report_failure(&self, name: &str, failure: &MinimizeError) {
        error!("Failed to minimize {}: {}", name, failure);
        self.diagnostics.push_error(name, build_error(name, failure));

        if let Some(partial) = failure.partial_output() {
            for warning in &partial.warnings {
                self.diagnostics.push_warning(name, build_warning(name, warning));
            }
            for reported in &partial.errors {
                self.diagnostics.push_error(name, build_reported_error(name, reported));
            }
        }
    }
}
