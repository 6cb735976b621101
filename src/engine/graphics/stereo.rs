//! Rendering device that wraps a backend with VR presentation when a
//! headset is available, and stays mono otherwise.

use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;

use super::renderer::{EyeTarget, RenderBackend};
use crate::engine::config::VrConfig;
use crate::engine::xr::{Availability, PlatformWindow, RuntimeError, VrSessionContext, XrRuntime};
use crate::engine::{EngineError, EngineResult};

pub struct StereoRenderer<B: RenderBackend, R: XrRuntime> {
    backend: B,
    vr: Option<VrSessionContext<R>>,
    /// A VR frame was begun this tick and must be ended.
    vr_frame_open: bool,
    /// Compositor wants pixels this frame.
    should_render: bool,
}

/// Builds the rendering device. VR is tried when enabled; any reason it
/// cannot run leaves a working mono device.
pub fn create_device<B: RenderBackend, R: XrRuntime>(
    window: &mut dyn PlatformWindow,
    backend: B,
    runtime: R,
    config: VrConfig,
) -> StereoRenderer<B, R> {
    if !config.enabled {
        info!("VR disabled by config; rendering mono");
        return StereoRenderer::mono(backend);
    }

    let kind = backend.kind();
    let mut vr = VrSessionContext::new(runtime, config);
    match vr.initialize(window, kind) {
        Ok(Availability::Ready) => {
            info!("VR device ready ({} eyes)", vr.eye_count());
            StereoRenderer::with_vr(backend, vr)
        }
        Ok(Availability::Unavailable) => {
            info!("VR unavailable; rendering mono");
            StereoRenderer::mono(backend)
        }
        Err(e) => {
            warn!("VR init failed, falling back to mono: {e}");
            StereoRenderer::mono(backend)
        }
    }
}

impl<B: RenderBackend, R: XrRuntime> StereoRenderer<B, R> {
    pub fn mono(backend: B) -> Self {
        Self {
            backend,
            vr: None,
            vr_frame_open: false,
            should_render: false,
        }
    }

    fn with_vr(backend: B, vr: VrSessionContext<R>) -> Self {
        Self {
            backend,
            vr: Some(vr),
            vr_frame_open: false,
            should_render: false,
        }
    }

    pub fn is_stereo(&self) -> bool {
        self.vr.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn vr(&self) -> Option<&VrSessionContext<R>> {
        self.vr.as_ref()
    }

    /// Starts a frame on the backend and, in VR, waits for the compositor.
    /// A VR frame that cannot start is skipped; the mono frame still runs.
    /// A lost session drops the device to mono for good.
    pub fn begin_frame(&mut self) -> EngineResult<()> {
        self.backend.begin_frame()?;

        let Some(vr) = self.vr.as_mut() else {
            return Ok(());
        };
        debug_assert!(!self.vr_frame_open, "previous VR frame never ended");
        let timing = match vr.wait_for_frame() {
            Ok(timing) => timing,
            Err(EngineError::Runtime(RuntimeError::SessionLost)) => {
                warn!("VR session lost; continuing mono");
                self.shutdown_vr();
                return Ok(());
            }
            Err(_) => return Ok(()),
        };
        if vr.begin_frame().is_ok() {
            self.vr_frame_open = true;
            self.should_render = timing.should_render;
        }
        Ok(())
    }

    /// Renders every eye into its swapchain image, ends the VR frame, then
    /// finishes the frame on the window.
    pub fn finalize_frame(&mut self) -> EngineResult<()> {
        if self.vr_frame_open {
            self.vr_frame_open = false;
            if let Some(vr) = self.vr.as_mut() {
                if self.should_render {
                    for eye in 0..vr.eye_count() {
                        if let Err(e) = render_eye(vr, &mut self.backend, eye) {
                            debug!("VR: eye {eye} skipped this frame: {e}");
                        }
                    }
                }
                // Failure is already counted and logged by the frame controller.
                let _ = vr.end_frame();
            }
        }
        self.backend.finalize_frame()
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.backend.resize(size);
    }

    /// Drops VR and keeps rendering mono.
    pub fn shutdown_vr(&mut self) {
        if let Some(mut vr) = self.vr.take() {
            if self.vr_frame_open {
                let _ = vr.end_frame();
                self.vr_frame_open = false;
            }
            vr.shutdown();
        }
    }
}

fn render_eye<B: RenderBackend, R: XrRuntime>(
    vr: &mut VrSessionContext<R>,
    backend: &mut B,
    eye: usize,
) -> EngineResult<()> {
    let image = vr.acquire_eye_image(eye)?;
    let (width, height) = vr.eye_extent(eye)?;
    let target = EyeTarget {
        eye,
        image,
        width,
        height,
        view: vr.eye_view_matrix(eye)?,
        projection: vr.eye_projection_matrix(eye)?,
    };
    let drawn = backend.render_to(&target);
    vr.release_eye_image(eye)?;
    drawn
}
