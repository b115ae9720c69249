use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Point-in-time view of a render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderProgress {
    pub completed_tiles: u32,
    pub total_tiles: u32,
    /// Time from pass start to the most recently composited tile.
    pub elapsed_ms: f64,
    pub is_complete: bool,
}

impl RenderProgress {
    /// Start of a pass over `total_tiles`. A pass with no tiles is complete.
    pub fn new(total_tiles: u32) -> Self {
        Self {
            completed_tiles: 0,
            total_tiles,
            elapsed_ms: 0.0,
            is_complete: total_tiles == 0,
        }
    }

    /// Share of composited tiles, 0 to 100. Zero when there is nothing to render.
    pub fn percentage(&self) -> f32 {
        match self.total_tiles {
            0 => 0.0,
            total => self.completed_tiles as f32 * 100.0 / total as f32,
        }
    }
}

/// Shared, observable progress of the current render pass.
///
/// Clones observe the same pass, so a UI can poll it while rendering runs.
#[derive(Clone, Debug, Default)]
pub struct ProgressHandle {
    inner: Arc<Mutex<RenderProgress>>,
}

impl ProgressHandle {
    pub fn snapshot(&self) -> RenderProgress {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut RenderProgress)) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub(crate) fn reset(&self, total_tiles: u32) {
        self.update(|p| *p = RenderProgress::new(total_tiles));
    }

    pub(crate) fn tile_completed(&self, elapsed: Duration) {
        self.update(|p| {
            p.completed_tiles += 1;
            p.elapsed_ms = elapsed.as_secs_f64() * 1000.0;
            p.is_complete = p.completed_tiles >= p.total_tiles;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_detached_from_later_updates() {
        let handle = ProgressHandle::default();
        handle.reset(4);

        let before = handle.snapshot();
        handle.tile_completed(Duration::from_millis(3));

        assert_eq!(before.completed_tiles, 0);
        assert_eq!(handle.snapshot().completed_tiles, 1);
        assert!((handle.snapshot().percentage() - 25.0).abs() < 0.001);
    }

    #[test]
    fn reset_starts_a_new_pass() {
        let handle = ProgressHandle::default();
        handle.reset(1);
        handle.tile_completed(Duration::from_millis(40));
        assert!(handle.snapshot().is_complete);

        handle.reset(3);
        assert_eq!(handle.snapshot(), RenderProgress::new(3));
        assert!(!handle.snapshot().is_complete);
    }

    #[test]
    fn empty_pass_is_complete_at_zero_percent() {
        let handle = ProgressHandle::default();
        handle.reset(0);

        let progress = handle.snapshot();
        assert!(progress.is_complete);
        assert_eq!(progress.percentage(), 0.0);
    }

    #[test]
    fn clones_see_updates_from_other_threads() {
        let handle = ProgressHandle::default();
        handle.reset(8);

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let handle = handle.clone();
                std::thread::spawn(move || handle.tile_completed(Duration::from_millis(i)))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let done = handle.snapshot();
        assert_eq!(done.completed_tiles, 8);
        assert!(done.is_complete);
    }
}
