pub mod render_worker;
pub mod worker_pool;

pub use render_worker::{RenderWorker, WorkerEvents, WorkerState};
pub use worker_pool::WorkerPool;
