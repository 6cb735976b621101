use super::eye::EyeTable;
use super::frame::FramePhase;
use super::frame_stats::FrameStats;
use super::handles::{InstanceHandle, SessionHandle, SpaceHandle, SystemHandle};
use super::runtime::{EyeView, FrameTiming, XrRuntime};
use super::window::{GlContextId, GraphicsContext};
use super::RendererKind;
use crate::engine::config::VrConfig;

/// GL context the session is bound to.
pub(super) enum ContextBinding {
    /// Already current on the window; its owner destroys it.
    Borrowed(GlContextId),
    /// Created for the session; destroyed when dropped.
    Owned(Box<dyn GraphicsContext>),
}

impl ContextBinding {
    pub(super) fn id(&self) -> GlContextId {
        match self {
            ContextBinding::Borrowed(id) => *id,
            ContextBinding::Owned(ctx) => ctx.id(),
        }
    }
}

/// All VR state for one rendering device.
///
/// Owned by the device that requested VR; every lifecycle and frame
/// operation takes it by `&mut self`. Dropping it shuts the session down.
pub struct VrSessionContext<R: XrRuntime> {
    pub(super) runtime: R,
    pub(super) config: VrConfig,
    pub(super) renderer_kind: RendererKind,

    pub(super) instance: Option<InstanceHandle>,
    pub(super) system: Option<SystemHandle>,
    pub(super) session: Option<SessionHandle>,
    pub(super) reference_space: Option<SpaceHandle>,
    pub(super) graphics_context: Option<ContextBinding>,
    pub(super) eyes: EyeTable,

    pub(super) phase: FramePhase,
    /// From the latest wait; stale once the frame ends.
    pub(super) frame_timing: Option<FrameTiming>,
    /// Views located this frame; `None` when the runtime could not locate them.
    pub(super) located_views: Option<Vec<EyeView>>,
    pub(super) stats: FrameStats,

    pub(super) initialized: bool,
}

impl<R: XrRuntime> VrSessionContext<R> {
    pub fn new(runtime: R, config: VrConfig) -> Self {
        Self {
            runtime,
            renderer_kind: config.renderer,
            config,
            instance: None,
            system: None,
            session: None,
            reference_space: None,
            graphics_context: None,
            eyes: EyeTable::default(),
            phase: FramePhase::Idle,
            frame_timing: None,
            located_views: None,
            stats: FrameStats::default(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn eyes(&self) -> &EyeTable {
        &self.eyes
    }

    pub fn eye_count(&self) -> usize {
        self.eyes.len()
    }

    pub fn renderer_kind(&self) -> RendererKind {
        self.renderer_kind
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn graphics_context(&self) -> Option<GlContextId> {
        self.graphics_context.as_ref().map(ContextBinding::id)
    }
}

impl<R: XrRuntime> Drop for VrSessionContext<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
