use crate::{EngineLoader, RenderContext, RenderEngine};
use log::{debug, warn};
use raytile_core::{MainToWorker, WorkerToMain};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to a running worker thread.
///
/// Requests go in through a channel; replies come out through the
/// `post_message` callback given to [`spawn_worker`], on the worker's thread.
pub struct WorkerUnit {
    id: usize,
    requests: Sender<MainToWorker>,
    thread: Option<JoinHandle<()>>,
}

/// Start a worker thread. It loads the engine and reports `Loaded` or
/// `LoadError` before accepting any request.
pub fn spawn_worker<L, F>(id: usize, loader: Arc<L>, post_message: F) -> io::Result<WorkerUnit>
where
    L: EngineLoader,
    F: FnMut(WorkerToMain) + Send + 'static,
{
    let (requests, inbox) = mpsc::channel();

    let thread = thread::Builder::new()
        .name(format!("raytile-worker-{id}"))
        .spawn(move || run_worker(id, loader.as_ref(), inbox, post_message))?;

    Ok(WorkerUnit {
        id,
        requests,
        thread: Some(thread),
    })
}

impl WorkerUnit {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Queue a request. Fails only if the worker thread has exited.
    pub fn post_message(&self, message: MainToWorker) -> Result<(), SendError<MainToWorker>> {
        self.requests.send(message)
    }

    /// True once the thread has returned (or been joined).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn is_joined(&self) -> bool {
        self.thread.is_none()
    }

    /// Ask the thread to exit and wait for it.
    ///
    /// Blocks until the current request (if any) finishes.
    pub fn terminate(&mut self) {
        let _ = self.requests.send(MainToWorker::Terminate);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Worker {} thread panicked during shutdown", self.id);
            }
        }
    }
}

impl Drop for WorkerUnit {
    fn drop(&mut self) {
        // Detach; only terminate() joins.
        if self.thread.is_some() {
            let _ = self.requests.send(MainToWorker::Terminate);
        }
    }
}

struct WorkerState<E: RenderEngine> {
    engine: E,
    context: Option<E::Context>,
}

enum Flow {
    Continue(Option<WorkerToMain>),
    Exit,
}

fn run_worker<L, F>(id: usize, loader: &L, inbox: Receiver<MainToWorker>, mut post_message: F)
where
    L: EngineLoader,
    F: FnMut(WorkerToMain),
{
    let engine = match panic::catch_unwind(AssertUnwindSafe(|| loader.load())) {
        Ok(Ok(engine)) => engine,
        Ok(Err(err)) => {
            post_message(WorkerToMain::LoadError {
                message: err.to_string(),
            });
            return;
        }
        Err(payload) => {
            post_message(WorkerToMain::LoadError {
                message: panic_message(payload.as_ref()),
            });
            return;
        }
    };

    debug!("Worker {} loaded", id);
    post_message(WorkerToMain::Loaded);

    let mut state = WorkerState {
        engine,
        context: None,
    };

    // Ends when the coordinator drops its sender, too.
    for message in inbox {
        match handle_message(id, &mut state, message) {
            Flow::Continue(Some(reply)) => post_message(reply),
            Flow::Continue(None) => {}
            Flow::Exit => break,
        }
    }

    debug!("Worker {} exiting", id);
}

fn handle_message<E: RenderEngine>(id: usize, state: &mut WorkerState<E>, message: MainToWorker) -> Flow {
    match message {
        MainToWorker::Init => {
            let engine = &state.engine;
            match panic::catch_unwind(AssertUnwindSafe(|| engine.new_instance())) {
                Ok(context) => state.context = Some(context),
                // Init has no reply; the next request reports the missing instance.
                Err(payload) => warn!(
                    "Worker {} failed to create engine instance: {}",
                    id,
                    panic_message(payload.as_ref())
                ),
            }
            Flow::Continue(None)
        }

        MainToWorker::LoadScene { request_id, scene } => {
            let reply = with_context(state, |context| context.load_scene(scene.as_bytes()));
            Flow::Continue(Some(match reply {
                Ok((width, height)) => WorkerToMain::SceneLoaded {
                    request_id,
                    width,
                    height,
                },
                Err(message) => WorkerToMain::Failed {
                    request_id,
                    message,
                },
            }))
        }

        MainToWorker::RenderTile { request_id, tile } => {
            let reply = with_context(state, |context| context.render_region(tile));
            Flow::Continue(Some(match reply {
                Ok(pixels) => WorkerToMain::RenderResult {
                    request_id,
                    tile,
                    pixels,
                },
                Err(message) => WorkerToMain::Failed {
                    request_id,
                    message,
                },
            }))
        }

        MainToWorker::Terminate => Flow::Exit,
    }
}

/// Run `f` against the engine instance, turning errors and panics into text.
fn with_context<E, T, F>(state: &mut WorkerState<E>, f: F) -> Result<T, String>
where
    E: RenderEngine,
    F: FnOnce(&mut E::Context) -> Result<T, crate::EngineError>,
{
    let Some(context) = state.context.as_mut() else {
        return Err("Engine instance not initialized".to_string());
    };

    match panic::catch_unwind(AssertUnwindSafe(|| f(context))) {
        Ok(result) => result.map_err(|err| err.to_string()),
        Err(payload) => Err(format!("Engine panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineError, TestPatternLoader};
    use raytile_core::{Scene, Tile};
    use std::time::Duration;

    fn spawn_collecting<L: EngineLoader>(loader: L) -> (WorkerUnit, mpsc::Receiver<WorkerToMain>) {
        let (tx, rx) = mpsc::channel();
        let unit = spawn_worker(0, Arc::new(loader), move |msg| {
            let _ = tx.send(msg);
        })
        .unwrap();
        (unit, rx)
    }

    fn recv(rx: &mpsc::Receiver<WorkerToMain>) -> WorkerToMain {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn reports_loaded_then_serves_requests_in_order() {
        let (mut unit, rx) = spawn_collecting(TestPatternLoader);
        assert_eq!(recv(&rx), WorkerToMain::Loaded);

        unit.post_message(MainToWorker::Init).unwrap();
        unit.post_message(MainToWorker::LoadScene {
            request_id: 1,
            scene: Scene::from(r#"{"width":4,"height":2}"#),
        })
        .unwrap();
        unit.post_message(MainToWorker::RenderTile {
            request_id: 2,
            tile: Tile::new(0, 0, 2, 2),
        })
        .unwrap();

        assert_eq!(
            recv(&rx),
            WorkerToMain::SceneLoaded {
                request_id: 1,
                width: 4,
                height: 2
            }
        );
        match recv(&rx) {
            WorkerToMain::RenderResult {
                request_id, pixels, ..
            } => {
                assert_eq!(request_id, 2);
                assert_eq!(pixels.len(), 12);
            }
            other => panic!("Wrong variant: {other:?}"),
        }

        unit.terminate();
    }

    #[test]
    fn load_error_is_reported() {
        let loader = || -> Result<crate::TestPatternEngine, EngineError> {
            Err(EngineError::new("missing module"))
        };
        let (_unit, rx) = spawn_collecting(loader);
        assert_eq!(
            recv(&rx),
            WorkerToMain::LoadError {
                message: "missing module".to_string()
            }
        );
    }

    #[test]
    fn scene_before_init_fails() {
        let (mut unit, rx) = spawn_collecting(TestPatternLoader);
        assert_eq!(recv(&rx), WorkerToMain::Loaded);

        unit.post_message(MainToWorker::LoadScene {
            request_id: 1,
            scene: Scene::from(r#"{"width":4,"height":2}"#),
        })
        .unwrap();

        assert!(matches!(recv(&rx), WorkerToMain::Failed { request_id: 1, .. }));
        unit.terminate();
    }

    #[test]
    fn panicking_loader_reports_load_error() {
        let loader = || -> Result<crate::TestPatternEngine, EngineError> { panic!("boom") };
        let (_unit, rx) = spawn_collecting(loader);
        assert_eq!(
            recv(&rx),
            WorkerToMain::LoadError {
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn post_after_terminate_fails() {
        let (mut unit, rx) = spawn_collecting(TestPatternLoader);
        assert_eq!(recv(&rx), WorkerToMain::Loaded);
        unit.terminate();
        assert!(unit.post_message(MainToWorker::Init).is_err());
    }
}
