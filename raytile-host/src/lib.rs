//! Coordinator side of the tile renderer: a pool of worker threads, each
//! driving its own engine instance, fed tiles from a shared queue.

pub mod config;
pub mod error;
pub mod events;
pub mod rendering;
pub mod workers;

pub use config::RenderSettings;
pub use error::{CompositeError, RenderError, WorkerError};
pub use events::{AwaitOnce, EventChannel, SubscriptionId};
pub use rendering::{
    Compositor, NullSurface, ParallelRenderer, ProgressHandle, RenderProgress, RenderStats, Surface,
    TileQueue,
};
pub use workers::{RenderWorker, WorkerPool, WorkerState};
