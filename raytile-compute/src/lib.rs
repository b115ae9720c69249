pub mod engine;
pub mod error;
pub mod test_image;
pub mod worker;

pub use engine::{EngineLoader, RenderContext, RenderEngine};
pub use error::EngineError;
pub use test_image::{Pattern, TestPatternContext, TestPatternEngine, TestPatternLoader, TestScene};
pub use worker::{spawn_worker, WorkerUnit};

// Re-export core types for convenience
pub use raytile_core::*;
