//! In-memory `XrRuntime` and `PlatformWindow` for tests.
//!
//! Every call is appended to a shared log so tests can assert ordering even
//! after the context that owned the runtime is gone. Failures are scripted
//! per call name.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use slotmap::SlotMap;

use super::binding::GraphicsBinding;
use super::handles::{
    ImageHandle, InstanceHandle, SessionHandle, SpaceHandle, SwapchainHandle, SystemHandle,
};
use super::runtime::{
    AppIdentity, EyeView, Fov, FrameTiming, Pose, ProjectionView, RuntimeError, RuntimeResult,
    SwapchainDesc, ViewConfigView, XrRuntime,
};
use super::window::{GlContextId, GraphicsContext, NativeDrawable, PlatformWindow};
use crate::engine::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateInstance(String),
    DestroyInstance(InstanceHandle),
    GetSystem,
    CreateSession(GraphicsBinding),
    DestroySession(SessionHandle),
    CreateSpace(Pose),
    DestroySpace(SpaceHandle),
    ViewConfiguration,
    SwapchainFormats,
    CreateSwapchain(SwapchainDesc),
    DestroySwapchain(SwapchainHandle),
    EnumerateImages(SwapchainHandle),
    WaitFrame,
    BeginFrame,
    EndFrame(Vec<ProjectionView>),
    Acquire(SwapchainHandle),
    WaitImage(SwapchainHandle, Option<Duration>),
    Release(SwapchainHandle),
    LocateViews,
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

struct Failure {
    call: &'static str,
    /// Zero-based occurrence to fail; `None` fails every occurrence.
    nth: Option<usize>,
    error: RuntimeError,
}

pub(crate) struct FakeRuntime {
    log: CallLog,
    failures: Vec<Failure>,
    counts: HashMap<&'static str, usize>,

    pub views: Vec<ViewConfigView>,
    pub formats: Vec<i64>,
    pub images_per_swapchain: usize,
    /// Views handed out by `locate_views`; `None` reports the pose unavailable.
    pub located: Option<Vec<EyeView>>,
    /// Index `acquire_image` returns instead of cycling through the ring.
    pub acquire_index: Option<u32>,
    pub should_render: bool,

    instances: SlotMap<InstanceHandle, ()>,
    systems: SlotMap<SystemHandle, ()>,
    sessions: SlotMap<SessionHandle, ()>,
    spaces: SlotMap<SpaceHandle, ()>,
    swapchains: SlotMap<SwapchainHandle, u64>,
    next_image: HashMap<SwapchainHandle, u32>,
    minted: u64,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            log: CallLog::default(),
            failures: Vec::new(),
            counts: HashMap::new(),
            views: vec![
                ViewConfigView {
                    recommended_width: 1832,
                    recommended_height: 1920,
                },
                ViewConfigView {
                    recommended_width: 1832,
                    recommended_height: 1920,
                },
            ],
            formats: vec![0x8C43, 0x8058],
            images_per_swapchain: 3,
            located: Some(vec![tracked_view(-0.032), tracked_view(0.032)]),
            acquire_index: None,
            should_render: true,
            instances: SlotMap::with_key(),
            systems: SlotMap::with_key(),
            sessions: SlotMap::with_key(),
            spaces: SlotMap::with_key(),
            swapchains: SlotMap::with_key(),
            next_image: HashMap::new(),
            minted: 0,
        }
    }
}

/// A located eye view, offset sideways by `x` meters.
pub(crate) fn tracked_view(x: f32) -> EyeView {
    EyeView {
        pose: Pose {
            orientation: [0.0, 0.0, 0.0, 1.0],
            position: [x, 1.6, 0.0],
        },
        fov: Fov {
            angle_left: -0.87,
            angle_right: 0.79,
            angle_up: 0.83,
            angle_down: -0.9,
        },
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Fails every call named `call`.
    pub fn fail(mut self, call: &'static str, error: RuntimeError) -> Self {
        self.failures.push(Failure {
            call,
            nth: None,
            error,
        });
        self
    }

    /// Fails only the `nth` (zero-based) call named `call`.
    pub fn fail_nth(mut self, call: &'static str, nth: usize, error: RuntimeError) -> Self {
        self.failures.push(Failure {
            call,
            nth: Some(nth),
            error,
        });
        self
    }

    pub fn live_swapchains(&self) -> usize {
        self.swapchains.len()
    }

    pub fn live_handles(&self) -> usize {
        self.instances.len() + self.sessions.len() + self.spaces.len() + self.swapchains.len()
    }

    fn record(&mut self, name: &'static str, call: Call) -> RuntimeResult<()> {
        self.log.borrow_mut().push(call);
        let count = self.counts.entry(name).or_insert(0);
        let nth = *count;
        *count += 1;
        match self
            .failures
            .iter()
            .find(|f| f.call == name && f.nth.is_none_or(|n| n == nth))
        {
            Some(f) => Err(f.error.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) fn call_failed(call: &'static str) -> RuntimeError {
    RuntimeError::Call { call, code: -1 }
}

impl XrRuntime for FakeRuntime {
    fn create_instance(&mut self, identity: &AppIdentity) -> RuntimeResult<InstanceHandle> {
        self.record(
            "create_instance",
            Call::CreateInstance(identity.application_name.clone()),
        )?;
        Ok(self.instances.insert(()))
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) {
        self.log.borrow_mut().push(Call::DestroyInstance(instance));
        self.instances.remove(instance);
    }

    fn get_system(&mut self, instance: InstanceHandle) -> RuntimeResult<SystemHandle> {
        self.record("get_system", Call::GetSystem)?;
        if !self.instances.contains_key(instance) {
            return Err(RuntimeError::UnknownHandle("instance"));
        }
        Ok(self.systems.insert(()))
    }

    fn create_session(
        &mut self,
        _instance: InstanceHandle,
        _system: SystemHandle,
        binding: &GraphicsBinding,
    ) -> RuntimeResult<SessionHandle> {
        self.record("create_session", Call::CreateSession(*binding))?;
        Ok(self.sessions.insert(()))
    }

    fn destroy_session(&mut self, session: SessionHandle) {
        self.log.borrow_mut().push(Call::DestroySession(session));
        self.sessions.remove(session);
    }

    fn create_reference_space(
        &mut self,
        _session: SessionHandle,
        pose_in_space: Pose,
    ) -> RuntimeResult<SpaceHandle> {
        self.record("create_reference_space", Call::CreateSpace(pose_in_space))?;
        Ok(self.spaces.insert(()))
    }

    fn destroy_space(&mut self, space: SpaceHandle) {
        self.log.borrow_mut().push(Call::DestroySpace(space));
        self.spaces.remove(space);
    }

    fn view_configuration(
        &mut self,
        _instance: InstanceHandle,
        _system: SystemHandle,
    ) -> RuntimeResult<Vec<ViewConfigView>> {
        self.record("view_configuration", Call::ViewConfiguration)?;
        Ok(self.views.clone())
    }

    fn swapchain_formats(&mut self, _session: SessionHandle) -> RuntimeResult<Vec<i64>> {
        self.record("swapchain_formats", Call::SwapchainFormats)?;
        Ok(self.formats.clone())
    }

    fn create_swapchain(
        &mut self,
        _session: SessionHandle,
        desc: &SwapchainDesc,
    ) -> RuntimeResult<SwapchainHandle> {
        self.record("create_swapchain", Call::CreateSwapchain(*desc))?;
        self.minted += 1;
        Ok(self.swapchains.insert(self.minted))
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) {
        self.log.borrow_mut().push(Call::DestroySwapchain(swapchain));
        self.swapchains.remove(swapchain);
    }

    fn enumerate_swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
    ) -> RuntimeResult<Vec<ImageHandle>> {
        self.record("enumerate_swapchain_images", Call::EnumerateImages(swapchain))?;
        let base = *self
            .swapchains
            .get(swapchain)
            .ok_or(RuntimeError::UnknownHandle("swapchain"))?;
        Ok((0..self.images_per_swapchain as u64)
            .map(|i| ImageHandle(base * 100 + i))
            .collect())
    }

    fn wait_frame(&mut self, _session: SessionHandle) -> RuntimeResult<FrameTiming> {
        self.record("wait_frame", Call::WaitFrame)?;
        let n = self.counts.get("wait_frame").copied().unwrap_or(0) as i64;
        Ok(FrameTiming {
            predicted_display_time: n * 11_111_111,
            predicted_display_period: 11_111_111,
            should_render: self.should_render,
        })
    }

    fn begin_frame(&mut self, _session: SessionHandle) -> RuntimeResult<()> {
        self.record("begin_frame", Call::BeginFrame)
    }

    fn end_frame(
        &mut self,
        _session: SessionHandle,
        _display_time: i64,
        _space: SpaceHandle,
        views: &[ProjectionView],
    ) -> RuntimeResult<()> {
        self.record("end_frame", Call::EndFrame(views.to_vec()))
    }

    fn acquire_image(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<u32> {
        self.record("acquire_image", Call::Acquire(swapchain))?;
        if let Some(index) = self.acquire_index {
            return Ok(index);
        }
        let count = self.images_per_swapchain.max(1) as u32;
        let next = self.next_image.entry(swapchain).or_insert(0);
        let index = *next;
        *next = (index + 1) % count;
        Ok(index)
    }

    fn wait_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout: Option<Duration>,
    ) -> RuntimeResult<()> {
        self.record("wait_image", Call::WaitImage(swapchain, timeout))
    }

    fn release_image(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<()> {
        self.record("release_image", Call::Release(swapchain))
    }

    fn locate_views(
        &mut self,
        _session: SessionHandle,
        _space: SpaceHandle,
        _display_time: i64,
    ) -> RuntimeResult<Vec<EyeView>> {
        self.record("locate_views", Call::LocateViews)?;
        self.located.clone().ok_or(RuntimeError::PoseUnavailable)
    }
}

/// Window whose GL context is either already current or created on demand.
pub(crate) struct FakeWindow {
    pub current: Option<GlContextId>,
    pub drawable: Option<NativeDrawable>,
    pub create_fails: bool,
    /// Live contexts created through this window.
    pub live_contexts: Rc<Cell<usize>>,
}

impl FakeWindow {
    /// A window with a GL context already current.
    pub fn with_context() -> Self {
        Self {
            current: Some(GlContextId(0x51)),
            drawable: Some(NativeDrawable::Win32Dc(0xD0)),
            create_fails: false,
            live_contexts: Rc::default(),
        }
    }

    /// A window with nothing current; contexts are created on demand.
    pub fn bare() -> Self {
        Self {
            current: None,
            ..Self::with_context()
        }
    }
}

struct FakeContext {
    id: GlContextId,
    live: Rc<Cell<usize>>,
}

impl GraphicsContext for FakeContext {
    fn id(&self) -> GlContextId {
        self.id
    }
}

impl Drop for FakeContext {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl PlatformWindow for FakeWindow {
    fn native_drawable(&self) -> Option<NativeDrawable> {
        self.drawable
    }

    fn current_gl_context(&self) -> Option<GlContextId> {
        self.current
    }

    fn create_gl_context(&mut self) -> EngineResult<Box<dyn GraphicsContext>> {
        if self.create_fails {
            return Err(EngineError::GraphicsContext("pixel format rejected".to_string()));
        }
        self.live_contexts.set(self.live_contexts.get() + 1);
        Ok(Box::new(FakeContext {
            id: GlContextId(0x77),
            live: self.live_contexts.clone(),
        }))
    }
}
