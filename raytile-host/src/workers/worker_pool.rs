use crate::error::WorkerError;
use crate::workers::RenderWorker;
use futures::future::{join_all, try_join_all};
use log::{error, info, warn};
use raytile_compute::EngineLoader;
use raytile_core::Scene;
use std::sync::Arc;

/// Fixed-size set of render workers sharing one engine loader.
pub struct WorkerPool {
    workers: Vec<RenderWorker>,
}

impl WorkerPool {
    /// Start `size` workers in parallel and wait until every one is ready.
    ///
    /// All-or-nothing: if any worker fails to load, the workers that did
    /// start are terminated and the first failure is returned.
    pub async fn start<L: EngineLoader>(size: usize, loader: L) -> Result<Self, WorkerError> {
        if size == 0 {
            return Err(WorkerError::EmptyPool);
        }

        info!("Creating WorkerPool with {} workers", size);

        let loader = Arc::new(loader);
        let results = join_all((0..size).map(|id| RenderWorker::start(id, Arc::clone(&loader)))).await;

        let mut workers = Vec::with_capacity(size);
        let mut first_error = None;
        for result in results {
            match result {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            error!(
                "Worker pool start failed ({} of {} workers ready): {}",
                workers.len(),
                size,
                err
            );
            for worker in &mut workers {
                worker.terminate();
            }
            return Err(err);
        }

        Ok(Self { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[RenderWorker] {
        &self.workers
    }

    pub fn workers_mut(&mut self) -> &mut [RenderWorker] {
        &mut self.workers
    }

    /// Ask every worker to build its engine instance. Returns immediately.
    pub fn initialize_all(&self) {
        for worker in &self.workers {
            worker.initialize();
        }
    }

    /// Broadcast the scene to every worker and wait for all of them.
    ///
    /// Returns the image size reported by the first worker. Every worker must
    /// report the same size.
    pub async fn load_scene_all(&mut self, scene: &Scene) -> Result<(u32, u32), WorkerError> {
        let sizes = try_join_all(self.workers.iter_mut().map(|worker| worker.load_scene(scene))).await?;

        let Some((&expected, rest)) = sizes.split_first() else {
            return Err(WorkerError::EmptyPool);
        };

        for (worker, &actual) in self.workers[1..].iter().zip(rest) {
            if actual != expected {
                warn!(
                    "Worker {} disagrees on scene size: {:?} vs {:?}",
                    worker.id(),
                    actual,
                    expected
                );
                return Err(WorkerError::DimensionMismatch {
                    worker: worker.id(),
                    expected,
                    actual,
                });
            }
        }

        info!(
            "Scene loaded on {} workers ({}x{})",
            self.workers.len(),
            expected.0,
            expected.1
        );
        Ok(expected)
    }

    /// Terminate every worker and wait for their threads.
    pub fn shutdown(&mut self) {
        for worker in &mut self.workers {
            worker.terminate();
        }
    }
}
