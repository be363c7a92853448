//! # Minimizer Plugin Orchestrator
//!
//! Questo è il modulo che guida un pass di ottimizzazione sull'asset graph dell'host.
//!
//! ## Fasi del pass:
//! 1. **Filter**: tiene gli asset che rispettano `test`/`include`/`exclude` e
//!    non sono già marcati come minimizzati
//! 2. **Cache**: calcola il fingerprint di ogni candidato e legge la sua entry;
//!    ogni miss conta come lavoro pendente
//! 3. **Sizing**: con `n` core disponibili, `min(pending, n)` worker; il pool
//!    viene avviato solo dal primo task che ne ha bisogno
//! 4. **Run**: un task per candidato attraverso il throttle, limitato dal numero
//!    di worker se c'è un pool e lavoro pendente, dal numero di task altrimenti
//! 5. **Teardown**: svuota e ferma il pool se è stato avviato
//!
//! Niente di ciò che fa un singolo asset può far fallire il pass; i fallimenti
//! finiscono nel sink dei diagnostic.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::report::{PassReport, TaskOutcome};
use super::task::{Candidate, Executor, TaskContext};
use crate::asset::{AssetGraph, AssetInfo};
use crate::cache::{CacheStore, Fingerprint, ResultCache};
use crate::config::{Config, Parallel};
use crate::diagnostics::{build_error, Diagnostics};
use crate::error::Result;
use crate::minimizer::{MinimizerRegistry, MinimizerSpec};
use crate::rules::AssetFilter;
use crate::throttle;
use crate::worker::LazyPool;

/// Label shown next to minimized assets in build stats.
pub const MINIMIZED_LABEL: &str = "minimized";

/// The minimizer stage, configured once and run once per optimize pass
pub struct HtmlMinimizerPlugin {
    filter: AssetFilter,
    spec: MinimizerSpec,
    parallel: Parallel,
    registry: MinimizerRegistry,
    cache: ResultCache,
}

impl HtmlMinimizerPlugin {
    /// Build the plugin. Configuration errors are returned here and never
    /// during a pass.
    pub fn new(config: &Config, registry: MinimizerRegistry, store: Arc<dyn CacheStore>) -> Result<Self> {
        config.validate()?;
        let filter = config.filter()?;
        let spec = config.spec()?;
        registry.resolve(&spec)?;
        let cache = ResultCache::new(store, spec.identity()?);

        debug!("Minimizer spec: {:?}", spec);
        Ok(Self {
            filter,
            spec,
            parallel: config.parallel,
            registry,
            cache,
        })
    }

    pub fn spec(&self) -> &MinimizerSpec {
        &self.spec
    }

    pub fn filter(&self) -> &AssetFilter {
        &self.filter
    }

    /// Stats hook: label for assets this plugin minimized.
    pub fn print_info(info: &AssetInfo) -> Option<&'static str> {
        info.minimized.then_some(MINIMIZED_LABEL)
    }

    /// Optimize-stage hook. `cpu_count` is the host's core count; the
    /// configured `parallel` option decides how many of them the pass uses.
    pub async fn on_optimize_assets(
        &self,
        assets: &dyn AssetGraph,
        diagnostics: &Diagnostics,
        cpu_count: usize,
    ) -> PassReport {
        let cores = self.parallel.available_cores(cpu_count);
        self.optimize(assets, diagnostics, cores).await
    }

    /// Run one pass with `available_cores` worker slots (0 runs inline).
    pub async fn optimize(
        &self,
        assets: &dyn AssetGraph,
        diagnostics: &Diagnostics,
        available_cores: usize,
    ) -> PassReport {
        let mut report = PassReport::default();
        let mut candidates = Vec::new();

        for asset in assets.list_assets() {
            if !self.filter.matches(&asset.name) {
                continue;
            }
            if asset.info.minimized {
                report.skipped_minimized += 1;
                continue;
            }

            let fingerprint = Fingerprint::of(asset.content.as_bytes());
            let item = self.cache.item(&asset.name, &fingerprint);
            let cached = match item.read().await {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cache lookup failed for {}: {}", asset.name, e);
                    None
                }
            };

            if cached.is_some() {
                report.cache_hits += 1;
            } else {
                report.pending += 1;
            }
            candidates.push(Candidate {
                name: asset.name,
                fingerprint,
                item,
                cached,
            });
        }

        report.candidates = candidates.len();
        if candidates.is_empty() {
            debug!("No assets to minimize");
            return report;
        }

        let pool = (available_cores > 0).then(|| {
            report.workers = report.pending.min(available_cores);
            LazyPool::new(report.workers, self.registry.clone())
        });
        report.throttle_limit = if pool.is_some() && report.pending > 0 {
            report.workers
        } else {
            candidates.len()
        };

        info!(
            "Minimizing {} assets ({} cached, {} workers, limit {})",
            report.candidates, report.cache_hits, report.workers, report.throttle_limit
        );

        let payload = pool.as_ref().map(|_| {
            serde_json::to_string(&self.spec)
                .map(Arc::<str>::from)
                .map_err(|e| e.to_string())
        });
        let executor = match (&pool, &payload) {
            (Some(pool), Some(payload)) => Executor::Pool { pool, payload },
            _ => Executor::Inline,
        };
        let context = TaskContext {
            assets,
            diagnostics,
            cache: &self.cache,
            registry: &self.registry,
            spec: &self.spec,
            executor,
        };

        let names: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        let context = &context;
        let tasks = candidates
            .into_iter()
            .map(|candidate| move || context.process(candidate));

        let results = throttle::run(report.throttle_limit, tasks).await;

        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(outcome) => report.record(outcome),
                Err(panicked) => {
                    diagnostics.push_error(name, build_error(name, &panicked));
                    report.record(TaskOutcome::Failed);
                }
            }
        }

        if let Some(pool) = pool {
            report.pool_started = pool.shutdown().await;
            if report.pool_started {
                debug!("Worker pool stopped");
            }
        }

        info!("{}", report.format_summary());
        report
    }
}

impl std::fmt::Debug for HtmlMinimizerPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlMinimizerPlugin")
            .field("spec", &self.spec)
            .field("parallel", &self.parallel)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
