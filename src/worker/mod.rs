//! # Worker Pool Module
//!
//! Questo modulo gestisce un insieme fisso di thread OS che eseguono le
//! minimizzazioni fuori dal task coordinatore.
//!
//! ## Trasporto:
//! - Le richieste passano su una coda MPMC `crossbeam`; ogni worker ha il suo
//!   clone del receiver e preleva il job successivo appena è libero
//! - Ogni richiesta porta il nome dell'asset, il testo e la `MinimizerSpec`
//!   serializzata in JSON una volta per pass; il worker la decodifica e risolve
//!   le implementazioni per nome nel proprio handle del registry
//! - Le risposte tornano su un canale oneshot per richiesta
//! - Un worker che muore durante una richiesta rilascia il sender della
//!   risposta, e questo emerge come `WorkerCrashed` solo per quell'asset
//!
//! ## Ciclo di vita:
//! - `spawn()` avvia subito tutti i worker
//! - `shutdown()` chiude la coda, lascia terminare le richieste in volo e in
//!   coda e fa join dei thread
//!
//! I worker condividono stdout/stderr del processo, quindi ciò che
//! un'implementazione stampa compare nell'output dell'host.

pub mod lazy;

pub use lazy::LazyPool;

use crossbeam::channel::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{MinimizeError, Result};
use crate::minimizer::{self, MinifyOutput, MinimizerRegistry, MinimizerSpec};

/// One remote `minify` call
#[derive(Debug, Clone)]
pub struct WorkRequest {
    pub name: String,
    pub input: String,
    /// JSON-encoded `MinimizerSpec`
    pub spec: Arc<str>,
}

struct Job {
    request: WorkRequest,
    reply: oneshot::Sender<Result<MinifyOutput>>,
}

/// Bounded set of minimization workers
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers (at least one).
    pub fn spawn(size: usize, registry: MinimizerRegistry) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(size.max(1));
        for id in 0..size.max(1) {
            let receiver = receiver.clone();
            let registry = registry.clone();
            let handle = thread::Builder::new()
                .name(format!("html-minimizer-worker-{id}"))
                .spawn(move || worker_loop(id, receiver, &registry))
                .map_err(MinimizeError::WorkerSpawn)?;
            workers.push(handle);
        }

        debug!("Started {} minimizer workers", workers.len());
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Minimize on a worker thread.
    pub async fn minify(&self, request: WorkRequest) -> Result<MinifyOutput> {
        let name = request.name.clone();
        let sender = self.sender.as_ref().ok_or(MinimizeError::WorkerGone)?;
        let (reply, response) = oneshot::channel();

        sender
            .send(Job { request, reply })
            .map_err(|_| MinimizeError::WorkerGone)?;

        response
            .await
            .map_err(|_| MinimizeError::WorkerCrashed(name))?
    }

    /// Drain the queue and join every worker.
    pub async fn shutdown(mut self) {
        drop(self.sender.take());
        let workers = std::mem::take(&mut self.workers);
        let count = workers.len();

        let joined = tokio::task::spawn_blocking(move || {
            for worker in workers {
                if worker.join().is_err() {
                    warn!("A minimizer worker exited with a panic");
                }
            }
        })
        .await;

        match joined {
            Ok(()) => debug!("Stopped {} minimizer workers", count),
            Err(e) => warn!("Failed to join minimizer workers: {}", e),
        }
    }
}

fn worker_loop(id: usize, receiver: Receiver<Job>, registry: &MinimizerRegistry) {
    // Ends once every sender is gone and the queue is drained.
    for Job { request, reply } in receiver.iter() {
        debug!("worker {} minimizing {}", id, request.name);
        let result = serde_json::from_str::<MinimizerSpec>(&request.spec)
            .map_err(|e| MinimizeError::SpecSerialization(e.to_string()))
            .and_then(|spec| minimizer::minify(registry, &request.name, &request.input, &spec));

        // The requester may have gone away; nothing to report then.
        let _ = reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimizer::MinimizerConfig;
    use std::collections::HashSet;

    fn spec_payload() -> Arc<str> {
        let spec = MinimizerConfig::default().build().unwrap();
        Arc::from(serde_json::to_string(&spec).unwrap())
    }

    #[tokio::test]
    async fn test_pool_minifies_off_thread() {
        let pool = WorkerPool::spawn(2, MinimizerRegistry::with_builtin()).unwrap();
        assert_eq!(pool.size(), 2);

        let out = pool
            .minify(WorkRequest {
                name: "a.html".into(),
                input: "<p> hi </p>".into(),
                spec: spec_payload(),
            })
            .await
            .unwrap();
        assert_eq!(out.code, "<p>hi</p>");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_requests_run_on_named_worker_threads() {
        let registry = MinimizerRegistry::new().with_fn("thread", |_, _, _| {
            let name = thread::current().name().unwrap_or_default().to_string();
            Ok(MinifyOutput::code(name))
        });
        let pool = WorkerPool::spawn(3, registry).unwrap();
        let spec: Arc<str> = Arc::from(r#"{"kind":"single","steps":{"implementation":"thread","options":{}}}"#);

        let calls = (0..6).map(|i| {
            pool.minify(WorkRequest {
                name: format!("{i}.html"),
                input: String::new(),
                spec: spec.clone(),
            })
        });
        let threads: HashSet<String> = futures::future::join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap().code)
            .collect();

        assert!(!threads.is_empty());
        assert!(threads.iter().all(|t| t.starts_with("html-minimizer-worker-")));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_idle_workers_pull_jobs_concurrently() {
        // Both calls must be inside the minimizer at once to get past the barrier.
        let barrier = Arc::new(std::sync::Barrier::new(2));
        let registry = MinimizerRegistry::new().with_fn("rendezvous", move |_, input, _| {
            barrier.wait();
            Ok(MinifyOutput::code(input.trim()))
        });
        let pool = WorkerPool::spawn(2, registry).unwrap();
        let spec: Arc<str> = Arc::from(r#"{"kind":"single","steps":{"implementation":"rendezvous","options":{}}}"#);

        let calls = ["a.html", "b.html"].map(|name| {
            pool.minify(WorkRequest {
                name: name.into(),
                input: format!(" {name} "),
                spec: spec.clone(),
            })
        });
        let outputs = futures::future::join_all(calls).await;

        assert_eq!(outputs[0].as_ref().unwrap().code, "a.html");
        assert_eq!(outputs[1].as_ref().unwrap().code, "b.html");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_requests_queue_behind_a_single_worker() {
        let pool = Arc::new(WorkerPool::spawn(1, MinimizerRegistry::with_builtin()).unwrap());
        let spec = spec_payload();

        let pending: Vec<_> = (0..4)
            .map(|i| {
                let pool = pool.clone();
                let spec = spec.clone();
                tokio::spawn(async move {
                    pool.minify(WorkRequest {
                        name: format!("{i}.html"),
                        input: format!("<p>  {i}  </p>"),
                        spec,
                    })
                    .await
                })
            })
            .collect();
        let mut outputs = Vec::new();
        for handle in pending {
            outputs.push(handle.await.unwrap().unwrap().code);
        }

        let pool = Arc::try_unwrap(pool).ok().unwrap();
        pool.shutdown().await;
        assert_eq!(outputs, vec!["<p>0</p>", "<p>1</p>", "<p>2</p>", "<p>3</p>"]);
    }

    #[tokio::test]
    async fn test_bad_spec_payload_is_per_request_error() {
        let pool = WorkerPool::spawn(1, MinimizerRegistry::with_builtin()).unwrap();
        let err = pool
            .minify(WorkRequest {
                name: "a.html".into(),
                input: "<p>".into(),
                spec: Arc::from("not json"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MinimizeError::SpecSerialization(_)));

        // the worker is still serving
        let out = pool
            .minify(WorkRequest {
                name: "b.html".into(),
                input: "<div>  x  </div>".into(),
                spec: spec_payload(),
            })
            .await
            .unwrap();
        assert_eq!(out.code, "<div>x</div>");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_implementation_failure_is_returned() {
        let registry = MinimizerRegistry::new()
            .with_fn("fail", |_, _, _| Err(anyhow::anyhow!("bad markup")));
        let pool = WorkerPool::spawn(1, registry).unwrap();
        let spec: Arc<str> = Arc::from(r#"{"kind":"single","steps":{"implementation":"fail","options":null}}"#);

        let err = pool
            .minify(WorkRequest {
                name: "b.html".into(),
                input: "<p>".into(),
                spec,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad markup"));
        pool.shutdown().await;
    }
}
