use crate::{Scene, Tile};
use serde::{Deserialize, Serialize};

/// Correlates a response with the request that caused it.
///
/// Ids are allocated per worker starting at 1; 0 is reserved for boot events.
pub type RequestId = u64;

/// Request id carried by events that are not replies to a request.
pub const BOOT_REQUEST_ID: RequestId = 0;

/// Messages sent from the coordinator to a worker unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum MainToWorker {
    /// Construct the engine instance. No reply is sent.
    Init,

    /// Hand the scene to the engine.
    LoadScene { request_id: RequestId, scene: Scene },

    /// Render one tile.
    RenderTile { request_id: RequestId, tile: Tile },

    /// Leave the worker loop.
    Terminate,
}

/// Messages sent from a worker unit to the coordinator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum WorkerToMain {
    /// Engine bootstrap finished, worker accepts requests.
    Loaded,

    /// Engine bootstrap failed; the worker exits after sending this.
    LoadError { message: String },

    /// Scene accepted; dimensions are the scene's output resolution.
    SceneLoaded {
        request_id: RequestId,
        width: u32,
        height: u32,
    },

    /// Packed RGB pixels for the requested tile, row-major, no padding.
    RenderResult {
        request_id: RequestId,
        tile: Tile,
        pixels: Vec<u8>,
    },

    /// A correlated request failed.
    Failed {
        request_id: RequestId,
        message: String,
    },
}

/// Kind of a worker response, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Loaded,
    LoadError,
    SceneLoaded,
    RenderResult,
    Failed,
}

/// Event name a response is published under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    pub kind: ResponseKind,
    pub request_id: RequestId,
}

impl Topic {
    pub fn new(kind: ResponseKind, request_id: RequestId) -> Self {
        Self { kind, request_id }
    }

    pub fn boot(kind: ResponseKind) -> Self {
        Self::new(kind, BOOT_REQUEST_ID)
    }
}

impl WorkerToMain {
    pub fn kind(&self) -> ResponseKind {
        match self {
            WorkerToMain::Loaded => ResponseKind::Loaded,
            WorkerToMain::LoadError { .. } => ResponseKind::LoadError,
            WorkerToMain::SceneLoaded { .. } => ResponseKind::SceneLoaded,
            WorkerToMain::RenderResult { .. } => ResponseKind::RenderResult,
            WorkerToMain::Failed { .. } => ResponseKind::Failed,
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            WorkerToMain::Loaded | WorkerToMain::LoadError { .. } => BOOT_REQUEST_ID,
            WorkerToMain::SceneLoaded { request_id, .. }
            | WorkerToMain::RenderResult { request_id, .. }
            | WorkerToMain::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn topic(&self) -> Topic {
        Topic::new(self.kind(), self.request_id())
    }
}
