//! Lifecycle controller: builds the session context in dependency order and
//! tears it down in reverse, on shutdown or on a failed step.

use std::fmt;

use tracing::{debug, info, warn};

use super::context::{ContextBinding, VrSessionContext};
use super::eye::{EyeResource, EyeTable};
use super::handles::SessionHandle;
use super::policy::choose_swapchain_format;
use super::runtime::{Pose, RuntimeError, SwapchainDesc, ViewConfigView, XrRuntime};
use super::window::PlatformWindow;
use super::{GraphicsBinding, RendererKind};
use crate::engine::{EngineError, EngineResult};

/// Outcome of a VR initialization that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Ready,
    /// No runtime or no headset. Callers render mono.
    Unavailable,
}

/// Initialization steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    GraphicsContext,
    Instance,
    System,
    Session,
    ReferenceSpace,
    Swapchains,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitStage::GraphicsContext => "graphics context",
            InitStage::Instance => "instance creation",
            InitStage::System => "system query",
            InitStage::Session => "session creation",
            InitStage::ReferenceSpace => "reference space creation",
            InitStage::Swapchains => "swapchain creation",
        })
    }
}

impl<R: XrRuntime> VrSessionContext<R> {
    /// Brings the session up against `window` for a `kind` backend.
    ///
    /// `Ok(Availability::Unavailable)` means no runtime or headset; any
    /// `Err` means a step failed and everything built so far was torn down.
    pub fn initialize(
        &mut self,
        window: &mut dyn PlatformWindow,
        kind: RendererKind,
    ) -> EngineResult<Availability> {
        if self.initialized {
            debug!("VR: already initialized");
            return Ok(Availability::Ready);
        }
        self.renderer_kind = kind;
        info!("VR: initializing for {} renderer", kind.as_str());

        // 1. graphics context
        if kind.uses_gl_context() {
            let binding = match window.current_gl_context() {
                Some(id) => ContextBinding::Borrowed(id),
                None => match window.create_gl_context() {
                    Ok(ctx) => ContextBinding::Owned(ctx),
                    Err(e) => return Err(init_error(InitStage::GraphicsContext, e)),
                },
            };
            self.graphics_context = Some(binding);
        }

        // 2. instance
        let identity = self.config.identity();
        let instance = match self.runtime.create_instance(&identity) {
            Ok(instance) => instance,
            Err(RuntimeError::LoaderUnavailable(reason)) => {
                info!("VR: no XR runtime available ({reason}); staying mono");
                self.teardown();
                return Ok(Availability::Unavailable);
            }
            Err(e) => return Err(self.fail(InitStage::Instance, e.into())),
        };
        self.instance = Some(instance);

        // 3. system
        let system = match self.runtime.get_system(instance) {
            Ok(system) => system,
            Err(RuntimeError::FormFactorUnavailable) => {
                info!("VR: runtime present but no headset; staying mono");
                self.teardown();
                return Ok(Availability::Unavailable);
            }
            Err(e) => return Err(self.fail(InitStage::System, e.into())),
        };
        self.system = Some(system);

        // 4. session
        let binding = if kind.uses_gl_context() {
            GraphicsBinding::resolve(kind, window.native_drawable(), self.graphics_context())
        } else {
            GraphicsBinding::Unbound
        };
        let session = match self.runtime.create_session(instance, system, &binding) {
            Ok(session) => session,
            Err(e) => return Err(self.fail(InitStage::Session, e.into())),
        };
        self.session = Some(session);

        // 5. reference space
        match self.runtime.create_reference_space(session, Pose::IDENTITY) {
            Ok(space) => self.reference_space = Some(space),
            Err(e) => return Err(self.fail(InitStage::ReferenceSpace, e.into())),
        }

        // 6. swapchains
        if let Err(e) = self.create_swapchains() {
            return Err(self.fail(InitStage::Swapchains, e));
        }

        self.initialized = true;
        for (eye, res) in self.eyes.iter().enumerate() {
            let (w, h) = res.extent();
            info!("VR: eye {eye}: {w}x{h}, {} images", res.images().len());
        }
        info!("VR: ready with {} eyes", self.eyes.len());
        Ok(Availability::Ready)
    }

    /// Tears everything down in reverse creation order. No-op when not initialized.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        info!("VR: shutting down ({})", self.stats);
        self.teardown();
        self.initialized = false;
    }

    /// Negotiates one swapchain per reported view. On failure no swapchain
    /// created by this call survives.
    pub(crate) fn create_swapchains(&mut self) -> EngineResult<()> {
        let (Some(instance), Some(system), Some(session)) =
            (self.instance, self.system, self.session)
        else {
            return Err(EngineError::NotInitialized);
        };
        debug_assert!(self.eyes.is_empty(), "swapchains already created");

        let views = self.runtime.view_configuration(instance, system)?;
        if views.is_empty() {
            return Err(EngineError::NoViews);
        }

        let preferred = self.config.preferred_swapchain_format;
        let supported = self.runtime.swapchain_formats(session)?;
        let format =
            choose_swapchain_format(&supported, preferred).ok_or(EngineError::NoSwapchainFormats)?;
        if format != preferred {
            info!("VR: format {preferred:#x} unsupported, using runtime's first ({format:#x})");
        }

        let mut built: Vec<EyeResource> = Vec::with_capacity(views.len());
        for (eye, view) in views.iter().enumerate() {
            match self.create_eye(session, eye, format, view) {
                Ok(res) => built.push(res),
                Err(e) => {
                    warn!("VR: swapchain for eye {eye} failed: {e}");
                    for res in built.drain(..) {
                        self.runtime.destroy_swapchain(res.swapchain());
                    }
                    return Err(e);
                }
            }
        }

        self.eyes = EyeTable::new(built);
        Ok(())
    }

    fn create_eye(
        &mut self,
        session: SessionHandle,
        eye: usize,
        format: i64,
        view: &ViewConfigView,
    ) -> EngineResult<EyeResource> {
        let desc = SwapchainDesc::color_target(format, view.recommended_width, view.recommended_height);
        let swapchain = self.runtime.create_swapchain(session, &desc)?;

        let images = match self.runtime.enumerate_swapchain_images(swapchain) {
            Ok(images) if !images.is_empty() => images,
            Ok(_) => {
                self.runtime.destroy_swapchain(swapchain);
                return Err(EngineError::EmptySwapchain(eye));
            }
            Err(e) => {
                self.runtime.destroy_swapchain(swapchain);
                return Err(e.into());
            }
        };

        Ok(EyeResource::new(swapchain, desc.width, desc.height, images))
    }

    /// Logs and rolls back a failed step.
    fn fail(&mut self, stage: InitStage, error: EngineError) -> EngineError {
        warn!("VR: {stage} failed: {error}; rolling back");
        self.teardown();
        init_error(stage, error)
    }

    /// Destroys whatever exists, newest first. Safe on any partial state.
    pub(super) fn teardown(&mut self) {
        for res in self.eyes.drain() {
            debug!("VR: destroying swapchain {:?}", res.swapchain());
            self.runtime.destroy_swapchain(res.swapchain());
        }
        if let Some(space) = self.reference_space.take() {
            debug!("VR: destroying reference space");
            self.runtime.destroy_space(space);
        }
        if let Some(session) = self.session.take() {
            debug!("VR: destroying session");
            self.runtime.destroy_session(session);
        }
        self.system = None;
        if let Some(instance) = self.instance.take() {
            debug!("VR: destroying instance");
            self.runtime.destroy_instance(instance);
        }
        if let Some(ContextBinding::Owned(_)) = self.graphics_context.take() {
            debug!("VR: releasing owned graphics context");
        }
        self.reset_frame_state();
    }
}

fn init_error(stage: InitStage, source: EngineError) -> EngineError {
    EngineError::Init {
        stage,
        source: Box::new(source),
    }
}
