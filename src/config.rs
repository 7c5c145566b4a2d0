use crate::error::{RenderError, RenderResult};
use crate::rendering::depth::DepthBufferKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Startup settings for a renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Quad-tree depth buffer instead of the flat one.
    pub hierarchical_depth: bool,
    /// Pool size; `None` uses the detected hardware parallelism.
    pub worker_threads: Option<usize>,
    /// Coarse clip test before rasterization.
    pub clip: bool,
    /// Gamma lookup on fragment colors.
    pub gamma: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            hierarchical_depth: false,
            worker_threads: None,
            clip: true,
            gamma: false,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| RenderError::config(format!("invalid render config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading render config");
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.worker_threads == Some(0) {
            return Err(RenderError::config("worker_threads must be > 0 when set"));
        }
        Ok(())
    }

    #[inline]
    pub fn depth_kind(&self) -> DepthBufferKind {
        DepthBufferKind::from_hierarchical(self.hierarchical_depth)
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
