//! VR configuration: JSON file plus environment override.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::engine::xr::{AppIdentity, IdleFrameSubmit, PREFERRED_SWAPCHAIN_FORMAT, RendererKind};
use crate::engine::{EngineError, EngineResult};

/// Forces VR on (`1`) or off (`0`) regardless of the config file.
pub const VR_ENV_OVERRIDE: &str = "STEREO_SHIM_VR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VrConfig {
    pub enabled: bool,
    pub renderer: RendererKind,
    pub application_name: String,
    pub engine_name: String,
    pub preferred_swapchain_format: i64,
    /// Watchdog on swapchain image waits; `None` waits without bound.
    pub image_wait_timeout_ms: Option<u64>,
    pub idle_frame_submit: IdleFrameSubmit,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            renderer: RendererKind::OpenGl1,
            application_name: "stereo-shim".to_string(),
            engine_name: "stereo-shim".to_string(),
            preferred_swapchain_format: PREFERRED_SWAPCHAIN_FORMAT,
            image_wait_timeout_ms: Some(1000),
            idle_frame_submit: IdleFrameSubmit::EndWithoutLayers,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }
}

impl VrConfig {
    /// Reads `path` when given, defaults otherwise, then applies the
    /// environment override.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_vr_override(std::env::var(VR_ENV_OVERRIDE).ok().as_deref());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| EngineError::ConfigParse {
            path: path.display().to_string(),
            source,
        })?;
        debug!("loaded VR config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn apply_vr_override(&mut self, value: Option<&str>) {
        match value {
            Some("1") => self.enabled = true,
            Some("0") => self.enabled = false,
            Some(other) => warn!("ignoring {}={:?} (expected 0 or 1)", VR_ENV_OVERRIDE, other),
            None => {}
        }
    }

    pub fn identity(&self) -> AppIdentity {
        AppIdentity {
            application_name: self.application_name.clone(),
            application_version: 1,
            engine_name: self.engine_name.clone(),
            engine_version: 1,
        }
    }

    pub fn image_wait_timeout(&self) -> Option<Duration> {
        self.image_wait_timeout_ms.map(Duration::from_millis)
    }
}
