//! `XrRuntime` over the `openxr` crate.
//!
//! The loader is opened on the first `create_instance`, so a machine
//! without one only finds out when VR is actually requested. Only the
//! OpenGL-on-Win32 session binding is wired up; other bindings are refused
//! at session creation.

use std::ptr;
use std::time::Duration;

use openxr as xr;
use slotmap::SlotMap;
use tracing::{debug, info, warn};

use super::binding::GraphicsBinding;
use super::handles::{
    ImageHandle, InstanceHandle, SessionHandle, SpaceHandle, SwapchainHandle, SystemHandle,
};
use super::runtime::{
    AppIdentity, EyeView, Fov, FrameTiming, Pose, ProjectionView, RuntimeError, RuntimeResult,
    SwapchainDesc, ViewConfigView, XrRuntime,
};
use super::window::NativeDrawable;

const VIEW_TYPE: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;

type GlSession = (
    xr::Session<xr::OpenGL>,
    xr::FrameWaiter,
    xr::FrameStream<xr::OpenGL>,
);

struct SystemEntry {
    instance: InstanceHandle,
    id: xr::SystemId,
}

struct SessionEntry {
    instance: InstanceHandle,
    session: xr::Session<xr::OpenGL>,
    waiter: xr::FrameWaiter,
    stream: xr::FrameStream<xr::OpenGL>,
    running: bool,
    /// The runtime is exiting or lost this session; it never runs again.
    lost: bool,
}

struct SwapchainEntry {
    instance: InstanceHandle,
    swapchain: xr::Swapchain<xr::OpenGL>,
}

#[derive(Default)]
pub struct OpenXrRuntime {
    entry: Option<xr::Entry>,
    instances: SlotMap<InstanceHandle, xr::Instance>,
    systems: SlotMap<SystemHandle, SystemEntry>,
    sessions: SlotMap<SessionHandle, SessionEntry>,
    spaces: SlotMap<SpaceHandle, xr::Space>,
    swapchains: SlotMap<SwapchainHandle, SwapchainEntry>,
}

impl OpenXrRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self) -> RuntimeResult<&xr::Entry> {
        if self.entry.is_none() {
            let entry = unsafe { xr::Entry::load() }
                .map_err(|e| RuntimeError::LoaderUnavailable(e.to_string()))?;
            self.entry = Some(entry);
        }
        self.entry
            .as_ref()
            .ok_or_else(|| RuntimeError::LoaderUnavailable("loader not loaded".to_string()))
    }

    fn instance(&self, instance: InstanceHandle) -> RuntimeResult<&xr::Instance> {
        self.instances
            .get(instance)
            .ok_or(RuntimeError::UnknownHandle("instance"))
    }

    fn session(&mut self, session: SessionHandle) -> RuntimeResult<&mut SessionEntry> {
        self.sessions
            .get_mut(session)
            .ok_or(RuntimeError::UnknownHandle("session"))
    }

    fn swapchain(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<&mut SwapchainEntry> {
        self.swapchains
            .get_mut(swapchain)
            .ok_or(RuntimeError::UnknownHandle("swapchain"))
    }

    /// Drains the instance event queue, starting or stopping `session` as
    /// the runtime asks. Exit or loss of the session (or the whole instance)
    /// is reported as `SessionLost`.
    fn pump_events(&mut self, session: SessionHandle) -> RuntimeResult<()> {
        let instance_key = self.session(session)?.instance;
        let instance = self
            .instances
            .get(instance_key)
            .ok_or(RuntimeError::UnknownHandle("instance"))?;
        let entry = self
            .sessions
            .get_mut(session)
            .ok_or(RuntimeError::UnknownHandle("session"))?;

        let mut buffer = xr::EventDataBuffer::new();
        while let Some(event) = instance
            .poll_event(&mut buffer)
            .map_err(|e| call_error("xrPollEvent", e))?
        {
            match event {
                xr::Event::SessionStateChanged(change) => {
                    debug!("VR: session state -> {:?}", change.state());
                    match change.state() {
                        xr::SessionState::READY => {
                            entry
                                .session
                                .begin(VIEW_TYPE)
                                .map_err(|e| call_error("xrBeginSession", e))?;
                            entry.running = true;
                            info!("VR: session running");
                        }
                        xr::SessionState::STOPPING => {
                            entry
                                .session
                                .end()
                                .map_err(|e| call_error("xrEndSession", e))?;
                            entry.running = false;
                            info!("VR: session stopped");
                        }
                        xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => {
                            warn!("VR: session {:?}", change.state());
                            entry.running = false;
                            entry.lost = true;
                        }
                        _ => {}
                    }
                }
                xr::Event::InstanceLossPending(_) => {
                    warn!("VR: instance loss pending");
                    entry.running = false;
                    entry.lost = true;
                }
                _ => {}
            }
        }

        if entry.lost {
            return Err(RuntimeError::SessionLost);
        }
        Ok(())
    }
}

impl XrRuntime for OpenXrRuntime {
    fn create_instance(&mut self, identity: &AppIdentity) -> RuntimeResult<InstanceHandle> {
        let entry = self.entry()?;
        let available = entry
            .enumerate_extensions()
            .map_err(|e| call_error("xrEnumerateInstanceExtensionProperties", e))?;
        let mut extensions = xr::ExtensionSet::default();
        extensions.khr_opengl_enable = available.khr_opengl_enable;
        if !available.khr_opengl_enable {
            warn!("VR: runtime lacks XR_KHR_opengl_enable; GL sessions will fail");
        }

        let app_info = xr::ApplicationInfo {
            application_name: &identity.application_name,
            application_version: identity.application_version,
            engine_name: &identity.engine_name,
            engine_version: identity.engine_version,
            api_version: xr::Version::new(1, 0, 0),
        };
        let instance = match entry.create_instance(&app_info, &extensions, &[]) {
            Ok(instance) => instance,
            Err(xr::sys::Result::ERROR_RUNTIME_UNAVAILABLE) => {
                return Err(RuntimeError::LoaderUnavailable(
                    "no active OpenXR runtime".to_string(),
                ));
            }
            Err(e) => return Err(call_error("xrCreateInstance", e)),
        };

        if let Ok(props) = instance.properties() {
            info!(
                "VR: OpenXR runtime: {} v{}",
                props.runtime_name, props.runtime_version
            );
        }
        Ok(self.instances.insert(instance))
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) {
        self.systems.retain(|_, s| s.instance != instance);
        self.instances.remove(instance);
    }

    fn get_system(&mut self, instance: InstanceHandle) -> RuntimeResult<SystemHandle> {
        let id = match self
            .instance(instance)?
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
        {
            Ok(id) => id,
            Err(xr::sys::Result::ERROR_FORM_FACTOR_UNAVAILABLE) => {
                return Err(RuntimeError::FormFactorUnavailable);
            }
            Err(e) => return Err(call_error("xrGetSystem", e)),
        };
        Ok(self.systems.insert(SystemEntry { instance, id }))
    }

    fn create_session(
        &mut self,
        instance: InstanceHandle,
        system: SystemHandle,
        binding: &GraphicsBinding,
    ) -> RuntimeResult<SessionHandle> {
        let (dc, glrc) = gl_session_target(binding)?;

        let system_id = self
            .systems
            .get(system)
            .ok_or(RuntimeError::UnknownHandle("system"))?
            .id;
        let xr_instance = self.instance(instance)?;

        // Required by the runtime before a GL session can be created.
        let requirements = xr_instance
            .graphics_requirements::<xr::OpenGL>(system_id)
            .map_err(|e| call_error("xrGetOpenGLGraphicsRequirementsKHR", e))?;
        debug!(
            "VR: GL requirements {}..{}",
            requirements.min_api_version_supported, requirements.max_api_version_supported
        );

        let (session, waiter, stream) = create_gl_session(xr_instance, system_id, dc, glrc)?;

        Ok(self.sessions.insert(SessionEntry {
            instance,
            session,
            waiter,
            stream,
            running: false,
            lost: false,
        }))
    }

    fn destroy_session(&mut self, session: SessionHandle) {
        self.sessions.remove(session);
    }

    fn create_reference_space(
        &mut self,
        session: SessionHandle,
        pose_in_space: Pose,
    ) -> RuntimeResult<SpaceHandle> {
        let space = self
            .session(session)?
            .session
            .create_reference_space(xr::ReferenceSpaceType::LOCAL, to_xr_pose(pose_in_space))
            .map_err(|e| call_error("xrCreateReferenceSpace", e))?;
        Ok(self.spaces.insert(space))
    }

    fn destroy_space(&mut self, space: SpaceHandle) {
        self.spaces.remove(space);
    }

    fn view_configuration(
        &mut self,
        instance: InstanceHandle,
        system: SystemHandle,
    ) -> RuntimeResult<Vec<ViewConfigView>> {
        let system_id = self
            .systems
            .get(system)
            .ok_or(RuntimeError::UnknownHandle("system"))?
            .id;
        let views = self
            .instance(instance)?
            .enumerate_view_configuration_views(system_id, VIEW_TYPE)
            .map_err(|e| call_error("xrEnumerateViewConfigurationViews", e))?;
        Ok(views
            .iter()
            .map(|v| ViewConfigView {
                recommended_width: v.recommended_image_rect_width,
                recommended_height: v.recommended_image_rect_height,
            })
            .collect())
    }

    fn swapchain_formats(&mut self, session: SessionHandle) -> RuntimeResult<Vec<i64>> {
        let formats = self
            .session(session)?
            .session
            .enumerate_swapchain_formats()
            .map_err(|e| call_error("xrEnumerateSwapchainFormats", e))?;
        Ok(formats.into_iter().map(i64::from).collect())
    }

    fn create_swapchain(
        &mut self,
        session: SessionHandle,
        desc: &SwapchainDesc,
    ) -> RuntimeResult<SwapchainHandle> {
        let format = u32::try_from(desc.format).map_err(|_| RuntimeError::Call {
            call: "xrCreateSwapchain",
            code: xr::sys::Result::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED.into_raw(),
        })?;
        let mut usage_flags = xr::SwapchainUsageFlags::EMPTY;
        if desc.sampled {
            usage_flags |= xr::SwapchainUsageFlags::SAMPLED;
        }
        if desc.color_attachment {
            usage_flags |= xr::SwapchainUsageFlags::COLOR_ATTACHMENT;
        }

        let entry = self.session(session)?;
        let instance = entry.instance;
        let swapchain = entry
            .session
            .create_swapchain(&xr::SwapchainCreateInfo {
                create_flags: xr::SwapchainCreateFlags::EMPTY,
                usage_flags,
                format,
                sample_count: desc.sample_count,
                width: desc.width,
                height: desc.height,
                face_count: desc.face_count,
                array_size: desc.array_size,
                mip_count: desc.mip_count,
            })
            .map_err(|e| call_error("xrCreateSwapchain", e))?;

        Ok(self.swapchains.insert(SwapchainEntry {
            instance,
            swapchain,
        }))
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) {
        self.swapchains.remove(swapchain);
    }

    fn enumerate_swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
    ) -> RuntimeResult<Vec<ImageHandle>> {
        let images = self
            .swapchain(swapchain)?
            .swapchain
            .enumerate_images()
            .map_err(|e| call_error("xrEnumerateSwapchainImages", e))?;
        Ok(images.into_iter().map(|tex| ImageHandle(u64::from(tex))).collect())
    }

    fn wait_frame(&mut self, session: SessionHandle) -> RuntimeResult<FrameTiming> {
        self.pump_events(session)?;
        let entry = self.session(session)?;
        if !entry.running {
            return Err(call_error(
                "xrWaitFrame",
                xr::sys::Result::ERROR_SESSION_NOT_RUNNING,
            ));
        }
        let state = entry
            .waiter
            .wait()
            .map_err(|e| call_error("xrWaitFrame", e))?;
        Ok(FrameTiming {
            predicted_display_time: state.predicted_display_time.as_nanos(),
            predicted_display_period: state.predicted_display_period.as_nanos(),
            should_render: state.should_render,
        })
    }

    fn begin_frame(&mut self, session: SessionHandle) -> RuntimeResult<()> {
        self.session(session)?
            .stream
            .begin()
            .map_err(|e| call_error("xrBeginFrame", e))
    }

    fn end_frame(
        &mut self,
        session: SessionHandle,
        display_time: i64,
        space: SpaceHandle,
        views: &[ProjectionView],
    ) -> RuntimeResult<()> {
        let display_time = xr::Time::from_nanos(display_time);
        let entry = self
            .sessions
            .get_mut(session)
            .ok_or(RuntimeError::UnknownHandle("session"))?;

        if views.is_empty() {
            return entry
                .stream
                .end(display_time, xr::EnvironmentBlendMode::OPAQUE, &[])
                .map_err(|e| call_error("xrEndFrame", e));
        }

        let space = self
            .spaces
            .get(space)
            .ok_or(RuntimeError::UnknownHandle("space"))?;
        let mut layer_views = Vec::with_capacity(views.len());
        for view in views {
            let swapchain = self
                .swapchains
                .get(view.swapchain)
                .ok_or(RuntimeError::UnknownHandle("swapchain"))?;
            layer_views.push(
                xr::CompositionLayerProjectionView::new()
                    .pose(to_xr_pose(view.view.pose))
                    .fov(to_xr_fov(view.view.fov))
                    .sub_image(
                        xr::SwapchainSubImage::new()
                            .swapchain(&swapchain.swapchain)
                            .image_array_index(0)
                            .image_rect(xr::Rect2Di {
                                offset: xr::Offset2Di { x: 0, y: 0 },
                                extent: xr::Extent2Di {
                                    width: view.image_width as i32,
                                    height: view.image_height as i32,
                                },
                            }),
                    ),
            );
        }

        let layer = xr::CompositionLayerProjection::new()
            .space(space)
            .views(&layer_views);
        entry
            .stream
            .end(display_time, xr::EnvironmentBlendMode::OPAQUE, &[&layer])
            .map_err(|e| call_error("xrEndFrame", e))
    }

    fn acquire_image(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<u32> {
        self.swapchain(swapchain)?
            .swapchain
            .acquire_image()
            .map_err(|e| call_error("xrAcquireSwapchainImage", e))
    }

    fn wait_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout: Option<Duration>,
    ) -> RuntimeResult<()> {
        let entry = self
            .swapchains
            .get(swapchain)
            .ok_or(RuntimeError::UnknownHandle("swapchain"))?;
        let instance = self
            .instances
            .get(entry.instance)
            .ok_or(RuntimeError::UnknownHandle("instance"))?;

        let timeout = match timeout {
            Some(t) => xr::Duration::from_nanos(i64::try_from(t.as_nanos()).unwrap_or(i64::MAX)),
            None => xr::Duration::INFINITE,
        };
        let info = xr::sys::SwapchainImageWaitInfo {
            ty: xr::sys::SwapchainImageWaitInfo::TYPE,
            next: ptr::null(),
            timeout,
        };
        // Called through the raw table: the wrapper folds TIMEOUT_EXPIRED into success.
        let result =
            unsafe { (instance.fp().wait_swapchain_image)(entry.swapchain.as_raw(), &info) };
        match result {
            xr::sys::Result::SUCCESS => Ok(()),
            xr::sys::Result::TIMEOUT_EXPIRED => Err(RuntimeError::Timeout),
            e => Err(call_error("xrWaitSwapchainImage", e)),
        }
    }

    fn release_image(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<()> {
        self.swapchain(swapchain)?
            .swapchain
            .release_image()
            .map_err(|e| call_error("xrReleaseSwapchainImage", e))
    }

    fn locate_views(
        &mut self,
        session: SessionHandle,
        space: SpaceHandle,
        display_time: i64,
    ) -> RuntimeResult<Vec<EyeView>> {
        let space = self
            .spaces
            .get(space)
            .ok_or(RuntimeError::UnknownHandle("space"))?;
        let entry = self
            .sessions
            .get(session)
            .ok_or(RuntimeError::UnknownHandle("session"))?;
        let (flags, views) = entry
            .session
            .locate_views(VIEW_TYPE, xr::Time::from_nanos(display_time), space)
            .map_err(|e| call_error("xrLocateViews", e))?;
        if !flags.contains(xr::ViewStateFlags::ORIENTATION_VALID) {
            return Err(RuntimeError::PoseUnavailable);
        }
        Ok(views
            .iter()
            .map(|v| EyeView {
                pose: from_xr_pose(v.pose),
                fov: Fov {
                    angle_left: v.fov.angle_left,
                    angle_right: v.fov.angle_right,
                    angle_up: v.fov.angle_up,
                    angle_down: v.fov.angle_down,
                },
            })
            .collect())
    }
}

fn call_error(call: &'static str, result: xr::sys::Result) -> RuntimeError {
    RuntimeError::Call {
        call,
        code: result.into_raw(),
    }
}

/// The Win32 DC and GLRC a GL session binds to.
fn gl_session_target(binding: &GraphicsBinding) -> RuntimeResult<(usize, usize)> {
    let GraphicsBinding::OpenGl {
        device_context,
        gl_context,
    } = *binding
    else {
        return Err(RuntimeError::UnsupportedBinding("no graphics binding"));
    };
    if !cfg!(windows) {
        return Err(RuntimeError::UnsupportedBinding(
            "OpenGL session binding requires Win32",
        ));
    }
    match device_context {
        Some(NativeDrawable::Win32Dc(dc)) => Ok((dc, gl_context.0)),
        None => Err(RuntimeError::UnsupportedBinding("OpenGL without a Win32 DC")),
    }
}

#[cfg(windows)]
fn create_gl_session(
    instance: &xr::Instance,
    system: xr::SystemId,
    dc: usize,
    glrc: usize,
) -> RuntimeResult<GlSession> {
    let info = xr::opengl::SessionCreateInfo::Windows {
        h_dc: dc as _,
        h_glrc: glrc as _,
    };
    unsafe { instance.create_session::<xr::OpenGL>(system, &info) }
        .map_err(|e| call_error("xrCreateSession", e))
}

#[cfg(not(windows))]
fn create_gl_session(
    _instance: &xr::Instance,
    _system: xr::SystemId,
    _dc: usize,
    _glrc: usize,
) -> RuntimeResult<GlSession> {
    Err(RuntimeError::UnsupportedBinding(
        "OpenGL session binding requires Win32",
    ))
}

fn to_xr_pose(pose: Pose) -> xr::Posef {
    let [x, y, z, w] = pose.orientation;
    let [px, py, pz] = pose.position;
    xr::Posef {
        orientation: xr::Quaternionf { x, y, z, w },
        position: xr::Vector3f {
            x: px,
            y: py,
            z: pz,
        },
    }
}

fn from_xr_pose(pose: xr::Posef) -> Pose {
    let o = pose.orientation;
    let p = pose.position;
    Pose {
        orientation: [o.x, o.y, o.z, o.w],
        position: [p.x, p.y, p.z],
    }
}

fn to_xr_fov(fov: Fov) -> xr::Fovf {
    xr::Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}
