use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque scene description handed verbatim to every worker's engine.
///
/// Cloning shares the underlying bytes, so broadcasting to a pool is cheap.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct Scene(Arc<[u8]>);

impl Scene {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene").field("len", &self.0.len()).finish()
    }
}

impl From<Vec<u8>> for Scene {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<Scene> for Vec<u8> {
    fn from(scene: Scene) -> Self {
        scene.0.to_vec()
    }
}

impl From<&[u8]> for Scene {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<String> for Scene {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl From<&str> for Scene {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes())
    }
}
