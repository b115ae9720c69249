//! Contract between a worker unit and the opaque render engine it drives.

use crate::EngineError;
use raytile_core::Tile;

/// One-time bootstrap of an engine, run on the worker's own thread.
///
/// The loader is shared by every worker in a pool, the engine it returns is not.
pub trait EngineLoader: Send + Sync + 'static {
    type Engine: RenderEngine;

    fn load(&self) -> Result<Self::Engine, EngineError>;
}

impl<F, E> EngineLoader for F
where
    F: Fn() -> Result<E, EngineError> + Send + Sync + 'static,
    E: RenderEngine,
{
    type Engine = E;

    fn load(&self) -> Result<E, EngineError> {
        self()
    }
}

/// A loaded engine able to construct render contexts.
pub trait RenderEngine {
    type Context: RenderContext;

    fn new_instance(&self) -> Self::Context;
}

/// Per-scene render state.
pub trait RenderContext {
    /// Accept a scene and report its output resolution as (width, height).
    fn load_scene(&mut self, scene: &[u8]) -> Result<(u32, u32), EngineError>;

    /// Render a region to packed RGB, row-major, `region.area() * 3` bytes.
    fn render_region(&mut self, region: Tile) -> Result<Vec<u8>, EngineError>;
}
