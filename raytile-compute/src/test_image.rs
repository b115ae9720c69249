// raytile-compute/src/test_image.rs

use crate::{EngineError, EngineLoader, RenderContext, RenderEngine};
use raytile_core::Tile;
use serde::{Deserialize, Serialize};

/// Pattern drawn by the test engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    /// Red ramps left to right, green top to bottom, blue is `x ^ y`.
    #[default]
    Gradient,
    /// Light/dark squares of `cell` pixels.
    Checker { cell: u32 },
}

/// Scene format understood by [`TestPatternEngine`]: a small JSON document.
///
/// ```json
/// {"width": 320, "height": 200, "pattern": {"kind": "checker", "cell": 16}}
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScene {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub pattern: Pattern,
}

impl TestScene {
    pub fn parse(bytes: &[u8]) -> Result<Self, EngineError> {
        let scene: TestScene = serde_json::from_slice(bytes)?;
        if scene.width == 0 || scene.height == 0 {
            return Err(EngineError::new(format!(
                "Scene has empty resolution {}x{}",
                scene.width, scene.height
            )));
        }
        if let Pattern::Checker { cell: 0 } = scene.pattern {
            return Err(EngineError::new("Checker cell size must be positive"));
        }
        Ok(scene)
    }

    /// Color of image pixel (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        match self.pattern {
            Pattern::Gradient => [
                ramp(x, self.width),
                ramp(y, self.height),
                ((x ^ y) & 0xff) as u8,
            ],
            Pattern::Checker { cell } => {
                if is_light_cell(x, y, cell) {
                    [230, 230, 230]
                } else {
                    [40, 40, 40]
                }
            }
        }
    }
}

/// Map `value` in [0, extent) onto [0, 255].
fn ramp(value: u32, extent: u32) -> u8 {
    if extent <= 1 {
        return 0;
    }
    (value as u64 * 255 / (extent as u64 - 1)) as u8
}

/// Determine if a pixel is on a "light" or "dark" checkerboard cell.
fn is_light_cell(x: u32, y: u32, cell: u32) -> bool {
    (x / cell + y / cell) % 2 == 0
}

/// Deterministic stand-in for a real ray tracer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestPatternEngine;

/// Loader for [`TestPatternEngine`]; never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestPatternLoader;

impl EngineLoader for TestPatternLoader {
    type Engine = TestPatternEngine;

    fn load(&self) -> Result<TestPatternEngine, EngineError> {
        Ok(TestPatternEngine)
    }
}

impl RenderEngine for TestPatternEngine {
    type Context = TestPatternContext;

    fn new_instance(&self) -> TestPatternContext {
        TestPatternContext::default()
    }
}

#[derive(Debug, Default)]
pub struct TestPatternContext {
    scene: Option<TestScene>,
}

impl RenderContext for TestPatternContext {
    fn load_scene(&mut self, scene: &[u8]) -> Result<(u32, u32), EngineError> {
        let scene = TestScene::parse(scene)?;
        self.scene = Some(scene);
        Ok((scene.width, scene.height))
    }

    fn render_region(&mut self, region: Tile) -> Result<Vec<u8>, EngineError> {
        let scene = self
            .scene
            .ok_or_else(|| EngineError::new("No scene loaded"))?;

        if !region.fits_within(scene.width, scene.height) {
            return Err(EngineError::new(format!(
                "Region {:?} outside {}x{} image",
                region, scene.width, scene.height
            )));
        }

        let mut pixels = Vec::with_capacity(region.rgb_len());
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                pixels.extend_from_slice(&scene.pixel(x, y));
            }
        }
        Ok(pixels)
    }
}
