use crate::config::RenderSettings;
use crate::error::{RenderError, WorkerError};
use crate::rendering::compositor::{Compositor, NullSurface, Surface};
use crate::rendering::render_progress::{ProgressHandle, RenderProgress};
use crate::rendering::tiles::{partition, TileQueue};
use crate::workers::WorkerPool;
use futures::future::try_join_all;
use log::{debug, error, info};
use raytile_compute::EngineLoader;
use raytile_core::{Framebuffer, Scene};
use std::cell::RefCell;
use std::time::{Duration, Instant};

/// Summary of a finished render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderStats {
    pub total_tiles: usize,
    /// Tiles rendered by each worker, indexed by worker id.
    pub tiles_per_worker: Vec<usize>,
    pub elapsed: Duration,
}

/// Parallel renderer that distributes tiles across a pool of worker threads.
///
/// Workers pull tiles from a shared queue as they finish, so faster workers
/// take more of the image. Results are composited on the calling thread.
pub struct ParallelRenderer<S: Surface = NullSurface> {
    pool: WorkerPool,
    compositor: Compositor<S>,
    progress: ProgressHandle,
    tile_size: u32,
}

impl<S: Surface> ParallelRenderer<S> {
    /// Start the pool described by `settings` and create each worker's engine instance.
    pub async fn start<L: EngineLoader>(
        settings: &RenderSettings,
        loader: L,
        surface: S,
    ) -> Result<Self, WorkerError> {
        let pool = WorkerPool::start(settings.worker_count(), loader).await?;
        pool.initialize_all();

        Ok(Self {
            pool,
            compositor: Compositor::new(surface),
            progress: ProgressHandle::default(),
            tile_size: settings.tile_size,
        })
    }

    /// Load `scene` on every worker and size the framebuffer to match.
    ///
    /// On failure no framebuffer is left allocated, so `render` reports
    /// `NoScene` until a scene loads successfully.
    pub async fn load_scene(&mut self, scene: &Scene) -> Result<(u32, u32), WorkerError> {
        self.compositor.release();

        let (width, height) = self.pool.load_scene_all(scene).await?;
        self.compositor.resize(width, height);
        Ok((width, height))
    }

    /// Run one render pass with the configured tile size.
    pub async fn render(&mut self) -> Result<RenderStats, RenderError> {
        self.render_with_tile_size(self.tile_size).await
    }

    /// Run one render pass.
    ///
    /// The first worker failure aborts the pass. Tiles composited before the
    /// failure stay in the framebuffer.
    pub async fn render_with_tile_size(&mut self, tile_size: u32) -> Result<RenderStats, RenderError> {
        if tile_size == 0 {
            return Err(RenderError::InvalidTileSize);
        }
        let (width, height) = self.compositor.size().ok_or(RenderError::NoScene)?;

        self.compositor.clear()?;

        let queue = TileQueue::new(partition(width, height, tile_size));
        let total_tiles = queue.len();
        self.progress.reset(total_tiles as u32);

        info!(
            "Rendering {}x{} in {} tiles of {}px on {} workers",
            width,
            height,
            total_tiles,
            tile_size,
            self.pool.len()
        );

        let start = Instant::now();
        let queue = &queue;
        let progress = &self.progress;
        let compositor = &RefCell::new(&mut self.compositor);

        let loops = self.pool.workers_mut().iter_mut().map(|worker| async move {
            let mut rendered = 0;
            while let Some(tile) = queue.next_tile() {
                let pixels = worker.render_tile(tile).await?;
                compositor.borrow_mut().apply_tile(tile, &pixels)?;
                rendered += 1;
                progress.tile_completed(start.elapsed());
                debug!("Worker {} composited tile {}", worker.id(), tile);
            }
            Ok::<usize, RenderError>(rendered)
        });

        match try_join_all(loops).await {
            Ok(tiles_per_worker) => {
                let elapsed = start.elapsed();
                info!(
                    "Render complete: {} tiles in {:.1}ms",
                    total_tiles,
                    elapsed.as_secs_f64() * 1000.0
                );
                Ok(RenderStats {
                    total_tiles,
                    tiles_per_worker,
                    elapsed,
                })
            }
            Err(err) => {
                let progress = self.progress.snapshot();
                error!(
                    "Render pass failed after {}/{} tiles: {}",
                    progress.completed_tiles, progress.total_tiles, err
                );
                Err(err)
            }
        }
    }

    /// Progress of the current or most recent pass.
    pub fn progress(&self) -> RenderProgress {
        self.progress.snapshot()
    }

    /// Shared handle for observing progress from elsewhere.
    pub fn progress_handle(&self) -> ProgressHandle {
        self.progress.clone()
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.compositor.framebuffer()
    }

    pub fn surface(&self) -> &S {
        self.compositor.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.compositor.surface_mut()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.len()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Size of the loaded scene, if any.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.compositor.size()
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Terminate every worker and wait for their threads to exit.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
#[path = "parallel_renderer_tests.rs"]
mod tests;
