// The backend seam: whatever actually draws the scene.

use winit::dpi::PhysicalSize;

use crate::engine::EngineResult;
use crate::engine::xr::{ImageHandle, RendererKind};

/// One eye's render target for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeTarget {
    pub eye: usize,
    /// Swapchain image to draw into; valid until the eye is released.
    pub image: ImageHandle,
    pub width: u32,
    pub height: u32,
    /// Column-major world-to-eye matrix.
    pub view: [f32; 16],
    /// Column-major GL projection.
    pub projection: [f32; 16],
}

pub trait RenderBackend {
    fn kind(&self) -> RendererKind;

    fn begin_frame(&mut self) -> EngineResult<()>;

    /// Draws the current scene into `target`.
    fn render_to(&mut self, target: &EyeTarget) -> EngineResult<()>;

    /// Finishes the frame on the window (mono view, or the mirror in VR).
    fn finalize_frame(&mut self) -> EngineResult<()>;

    fn resize(&mut self, size: PhysicalSize<u32>);
}
