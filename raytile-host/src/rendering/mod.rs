pub mod compositor;
pub mod parallel_renderer;
pub mod render_progress;
pub mod tiles;

pub use compositor::{Compositor, NullSurface, Surface};
pub use parallel_renderer::{ParallelRenderer, RenderStats};
pub use render_progress::{ProgressHandle, RenderProgress};
pub use tiles::{partition, TileQueue};
