use crate::error::WorkerError;
use crate::events::EventChannel;
use log::{debug, error, info, warn};
use raytile_compute::{spawn_worker, EngineLoader, WorkerUnit};
use raytile_core::{MainToWorker, RequestId, ResponseKind, Scene, Tile, Topic, WorkerToMain};
use std::sync::Arc;

/// Replies from one worker unit, keyed by kind and request id.
pub type WorkerEvents = EventChannel<Topic, WorkerToMain>;

/// Lifecycle of a render worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread spawned, engine still loading.
    Starting,
    /// Engine loaded, no scene yet.
    Ready,
    /// Scene accepted; idle between tiles.
    SceneLoaded,
    /// A tile request is in flight (or was abandoned mid-flight).
    Busy,
    /// The last request failed. Engine-load failures never yield a handle.
    Failed,
    Terminated,
}

enum RequestFailure {
    Disconnected,
    Rejected(String),
}

/// Coordinator-side handle to one worker unit.
///
/// Requests take `&mut self`, so at most one is outstanding per worker. Each
/// request gets a fresh id and waits only on topics carrying that id.
pub struct RenderWorker {
    id: usize,
    state: WorkerState,
    unit: WorkerUnit,
    events: Arc<WorkerEvents>,
    next_request_id: RequestId,
    has_scene: bool,
    tiles_rendered: usize,
}

impl RenderWorker {
    /// Spawn the worker unit and wait until it reports its engine loaded.
    pub async fn start<L: EngineLoader>(id: usize, loader: Arc<L>) -> Result<Self, WorkerError> {
        let events: Arc<WorkerEvents> = Arc::new(EventChannel::new());

        // Subscribe before spawning so the boot event cannot be missed.
        let ready = events.await_once(
            Topic::boot(ResponseKind::Loaded),
            Some(Topic::boot(ResponseKind::LoadError)),
        );

        let publisher = Arc::clone(&events);
        let unit = spawn_worker(id, loader, move |message: WorkerToMain| {
            let topic = message.topic();
            if publisher.publish(&topic, &message) == 0 {
                debug!(
                    "Worker {} reply {:?} had no listener (abandoned request)",
                    id, topic
                );
            }
        })
        .map_err(|err| WorkerError::EngineLoad {
            worker: id,
            message: format!("Failed to spawn worker thread: {}", err),
        })?;

        let mut worker = Self {
            id,
            state: WorkerState::Starting,
            unit,
            events,
            next_request_id: 1,
            has_scene: false,
            tiles_rendered: 0,
        };

        match ready.await {
            Ok(_) => {
                worker.state = WorkerState::Ready;
                info!("Worker {} ready", id);
                Ok(worker)
            }
            Err(reply) => {
                worker.state = WorkerState::Failed;
                let message = failure_message(reply);
                error!("Worker {} failed to load engine: {}", id, message);
                Err(WorkerError::EngineLoad { worker: id, message })
            }
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Tiles this worker has rendered successfully since it started.
    pub fn tiles_rendered(&self) -> usize {
        self.tiles_rendered
    }

    /// Tell the unit to construct its engine instance. Does not wait.
    pub fn initialize(&self) {
        if self.unit.post_message(MainToWorker::Init).is_err() {
            warn!("Worker {} is gone; init not delivered", self.id);
        }
    }

    /// Hand the scene to the engine and return its (width, height).
    pub async fn load_scene(&mut self, scene: &Scene) -> Result<(u32, u32), WorkerError> {
        if self.state == WorkerState::Terminated {
            return Err(self.invalid_state("load a scene"));
        }

        let scene = scene.clone();
        let reply = self
            .request(ResponseKind::SceneLoaded, move |request_id| {
                MainToWorker::LoadScene { request_id, scene }
            })
            .await;

        match reply {
            Ok(WorkerToMain::SceneLoaded { width, height, .. }) => {
                self.state = WorkerState::SceneLoaded;
                self.has_scene = true;
                debug!("Worker {} loaded scene ({}x{})", self.id, width, height);
                Ok((width, height))
            }
            Ok(other) => Err(self.fail_scene(format!("Unexpected reply {:?}", other.kind()))),
            Err(RequestFailure::Disconnected) => Err(self.disconnected()),
            Err(RequestFailure::Rejected(message)) => Err(self.fail_scene(message)),
        }
    }

    /// Render one tile, returning `tile.area() * 3` bytes of packed RGB.
    pub async fn render_tile(&mut self, tile: Tile) -> Result<Vec<u8>, WorkerError> {
        if !self.has_scene || self.state == WorkerState::Terminated {
            return Err(self.invalid_state("render a tile"));
        }

        self.state = WorkerState::Busy;
        let reply = self
            .request(ResponseKind::RenderResult, move |request_id| {
                MainToWorker::RenderTile { request_id, tile }
            })
            .await;

        match reply {
            Ok(WorkerToMain::RenderResult {
                tile: rendered,
                pixels,
                ..
            }) => {
                if rendered != tile {
                    return Err(self.fail_render(tile, format!("Worker answered for tile {}", rendered)));
                }
                if pixels.len() != tile.rgb_len() {
                    return Err(self.fail_render(
                        tile,
                        format!("Expected {} bytes of RGB, got {}", tile.rgb_len(), pixels.len()),
                    ));
                }
                self.state = WorkerState::SceneLoaded;
                self.tiles_rendered += 1;
                Ok(pixels)
            }
            Ok(other) => Err(self.fail_render(tile, format!("Unexpected reply {:?}", other.kind()))),
            Err(RequestFailure::Disconnected) => Err(self.disconnected()),
            Err(RequestFailure::Rejected(message)) => Err(self.fail_render(tile, message)),
        }
    }

    /// Stop the unit and wait for its thread to exit.
    pub fn terminate(&mut self) {
        if self.state != WorkerState::Terminated {
            self.unit.terminate();
            self.state = WorkerState::Terminated;
            debug!("Worker {} terminated", self.id);
        }
    }

    async fn request(
        &mut self,
        success: ResponseKind,
        build: impl FnOnce(RequestId) -> MainToWorker,
    ) -> Result<WorkerToMain, RequestFailure> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let reply = self.events.await_once(
            Topic::new(success, request_id),
            Some(Topic::new(ResponseKind::Failed, request_id)),
        );

        if self.unit.post_message(build(request_id)).is_err() {
            return Err(RequestFailure::Disconnected);
        }

        reply.await.map_err(|reply| RequestFailure::Rejected(failure_message(reply)))
    }

    fn invalid_state(&self, operation: &'static str) -> WorkerError {
        WorkerError::InvalidState {
            worker: self.id,
            state: self.state,
            operation,
        }
    }

    fn disconnected(&mut self) -> WorkerError {
        // The thread has already returned; this only reaps it.
        self.unit.terminate();
        self.state = WorkerState::Terminated;
        error!("Worker {} thread has exited", self.id);
        WorkerError::Disconnected { worker: self.id }
    }

    fn fail_scene(&mut self, message: String) -> WorkerError {
        self.state = WorkerState::Failed;
        self.has_scene = false;
        error!("Worker {} rejected scene: {}", self.id, message);
        WorkerError::SceneLoad {
            worker: self.id,
            message,
        }
    }

    fn fail_render(&mut self, tile: Tile, message: String) -> WorkerError {
        self.state = WorkerState::Failed;
        error!("Worker {} failed on tile {}: {}", self.id, tile, message);
        WorkerError::Render {
            worker: self.id,
            tile,
            message,
        }
    }
}

fn failure_message(reply: WorkerToMain) -> String {
    match reply {
        WorkerToMain::LoadError { message } | WorkerToMain::Failed { message, .. } => message,
        other => format!("Unexpected reply {:?}", other.kind()),
    }
}
