pub mod cli;
pub mod config;
pub mod graphics;
pub mod windowing;
pub mod xr;

pub use windowing::Windowing;

use crate::engine::xr::{InitStage, RuntimeError};

/// Engine-level error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("VR session is not initialized")]
    NotInitialized,

    #[error("eye {eye} out of range ({count} eyes)")]
    EyeOutOfRange { eye: usize, count: usize },

    #[error("eye {0} already has an acquired image")]
    EyeAlreadyAcquired(usize),

    #[error("eye {0} has no acquired image")]
    EyeNotAcquired(usize),

    #[error("{call} called out of order (frame is {phase})")]
    FrameOutOfOrder {
        call: &'static str,
        phase: &'static str,
    },

    #[error("graphics context: {0}")]
    GraphicsContext(String),

    #[error("VR initialization failed at {stage}: {source}")]
    Init {
        stage: InitStage,
        #[source]
        source: Box<EngineError>,
    },

    #[error("runtime offers no swapchain formats")]
    NoSwapchainFormats,

    #[error("runtime reported an empty view configuration")]
    NoViews,

    #[error("swapchain for eye {0} has no images")]
    EmptySwapchain(usize),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("windowing: {0}")]
    Windowing(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
