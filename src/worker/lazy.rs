//! Creazione differita e single-flight del worker pool.
//!
//! Un pass paga i thread worker solo se almeno un asset va davvero
//! minimizzato. Le prime richieste concorrenti attendono tutte la stessa
//! inizializzazione, quindi ogni `LazyPool` avvia al massimo un pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::info;

use super::{WorkRequest, WorkerPool};
use crate::error::Result;
use crate::minimizer::{MinifyOutput, MinimizerRegistry};

pub struct LazyPool {
    size: usize,
    registry: MinimizerRegistry,
    cell: OnceCell<WorkerPool>,
    spawned: AtomicUsize,
}

impl LazyPool {
    pub fn new(size: usize, registry: MinimizerRegistry) -> Self {
        Self {
            size,
            registry,
            cell: OnceCell::new(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Pool handle, starting the workers on first use.
    pub async fn get(&self) -> Result<&WorkerPool> {
        self.cell
            .get_or_try_init(|| async {
                self.spawned.fetch_add(1, Ordering::SeqCst);
                info!("Starting {} minimizer workers", self.size);
                WorkerPool::spawn(self.size, self.registry.clone())
            })
            .await
    }

    pub async fn minify(&self, request: WorkRequest) -> Result<MinifyOutput> {
        self.get().await?.minify(request).await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// How many times pool creation was attempted.
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Stop the workers if they were ever started. Returns whether a pool
    /// existed.
    pub async fn shutdown(self) -> bool {
        match self.cell.into_inner() {
            Some(pool) => {
                pool.shutdown().await;
                true
            }
            None => false,
        }
    }
}
