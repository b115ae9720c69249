pub mod framebuffer;
pub mod messages;
pub mod scene;
pub mod tile;

pub use framebuffer::Framebuffer;
pub use messages::{
    MainToWorker, RequestId, ResponseKind, Topic, WorkerToMain, BOOT_REQUEST_ID,
};
pub use scene::Scene;
pub use tile::Tile;
