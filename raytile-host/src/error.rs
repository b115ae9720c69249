//! Error types for the worker pool and render passes.

use crate::workers::WorkerState;
use raytile_core::Tile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker {worker} failed to load its engine: {message}")]
    EngineLoad { worker: usize, message: String },

    #[error("Worker {worker} rejected the scene: {message}")]
    SceneLoad { worker: usize, message: String },

    #[error("Worker {worker} failed to render tile {tile}: {message}")]
    Render {
        worker: usize,
        tile: Tile,
        message: String,
    },

    #[error("Worker {worker} reported scene size {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        worker: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Worker {worker} is no longer running")]
    Disconnected { worker: usize },

    #[error("Worker {worker} cannot {operation} while {state:?}")]
    InvalidState {
        worker: usize,
        state: WorkerState,
        operation: &'static str,
    },

    #[error("Worker pool needs at least one worker")]
    EmptyPool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompositeError {
    #[error("No framebuffer allocated; load a scene first")]
    NoFramebuffer,

    #[error("Tile {tile} lies outside the {width}x{height} framebuffer")]
    OutOfBounds { tile: Tile, width: u32, height: u32 },

    #[error("Tile {tile} needs {expected} bytes of RGB data, got {actual}")]
    DataLength {
        tile: Tile,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error("No scene loaded")]
    NoScene,

    #[error("Tile size must be positive")]
    InvalidTileSize,
}
