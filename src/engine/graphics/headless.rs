use tracing::debug;
use winit::dpi::PhysicalSize;

use super::renderer::{EyeTarget, RenderBackend};
use crate::engine::EngineResult;
use crate::engine::xr::RendererKind;

/// Backend that draws nothing and remembers what it was asked to draw.
#[derive(Debug)]
pub struct HeadlessBackend {
    kind: RendererKind,
    size: PhysicalSize<u32>,
    frames_begun: u64,
    frames_finalized: u64,
    /// Eye targets drawn during the current (or last) frame.
    eye_draws: Vec<EyeTarget>,
}

impl HeadlessBackend {
    pub fn new(kind: RendererKind) -> Self {
        Self {
            kind,
            size: PhysicalSize::new(0, 0),
            frames_begun: 0,
            frames_finalized: 0,
            eye_draws: Vec::new(),
        }
    }

    pub fn frames_begun(&self) -> u64 {
        self.frames_begun
    }

    pub fn frames_finalized(&self) -> u64 {
        self.frames_finalized
    }

    pub fn eye_draws(&self) -> &[EyeTarget] {
        &self.eye_draws
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }
}

impl RenderBackend for HeadlessBackend {
    fn kind(&self) -> RendererKind {
        self.kind
    }

    fn begin_frame(&mut self) -> EngineResult<()> {
        self.frames_begun += 1;
        self.eye_draws.clear();
        Ok(())
    }

    fn render_to(&mut self, target: &EyeTarget) -> EngineResult<()> {
        self.eye_draws.push(*target);
        Ok(())
    }

    fn finalize_frame(&mut self) -> EngineResult<()> {
        self.frames_finalized += 1;
        if self.frames_finalized % 600 == 0 {
            debug!(
                "headless: {} frames, {} eye draws last frame",
                self.frames_finalized,
                self.eye_draws.len()
            );
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
    }
}
