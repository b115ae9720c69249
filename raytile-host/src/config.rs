//! Runtime settings for the worker pool and render passes.
//!
//! Defaults can be overridden from JSON or from `RAYTILE_*` environment
//! variables.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::thread;

const WORKERS_ENV: &str = "RAYTILE_WORKERS";
const TILE_SIZE_ENV: &str = "RAYTILE_TILE_SIZE";

pub const DEFAULT_TILE_SIZE: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Number of render workers.
    /// Positive: use that exact number of workers.
    /// Zero or negative: hardware parallelism + this value (e.g. -1 leaves one core free).
    /// Never resolves below one worker.
    pub worker_count: i32,
    /// Edge length of square tiles in pixels. Edge tiles are clipped.
    pub tile_size: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            worker_count: 0, // all available cores
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl RenderSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(count) = lookup(WORKERS_ENV).and_then(|v| v.trim().parse::<i32>().ok()) {
            self.worker_count = count;
        }
        if let Some(size) = lookup(TILE_SIZE_ENV)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&size| size > 0)
        {
            self.tile_size = size;
        }
        self
    }

    /// Effective worker count for this machine.
    pub fn worker_count(&self) -> usize {
        resolve_worker_count(self.worker_count, hardware_parallelism())
    }
}

/// Available hardware parallelism, 1 if it cannot be determined.
pub fn hardware_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

fn resolve_worker_count(configured: i32, hardware: usize) -> usize {
    if configured > 0 {
        configured as usize
    } else {
        let hardware = hardware as i64 + configured as i64;
        hardware.max(1) as usize
    }
}
