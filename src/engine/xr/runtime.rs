//! The seam between the VR subsystem and the platform XR runtime.
//!
//! Everything the lifecycle and frame controllers need from the runtime
//! goes through `XrRuntime`. `OpenXrRuntime` implements it over the
//! `openxr` crate; tests implement it in memory.

use std::time::Duration;

use super::binding::GraphicsBinding;
use super::handles::{
    ImageHandle, InstanceHandle, SessionHandle, SpaceHandle, SwapchainHandle, SystemHandle,
};

/// Errors reported by a runtime call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("XR loader unavailable: {0}")]
    LoaderUnavailable(String),

    #[error("no head-mounted display available")]
    FormFactorUnavailable,

    #[error("{call} failed with result {code}")]
    Call { call: &'static str, code: i32 },

    #[error("unknown {0} handle")]
    UnknownHandle(&'static str),

    #[error("graphics binding not supported: {0}")]
    UnsupportedBinding(&'static str),

    #[error("timed out waiting for swapchain image")]
    Timeout,

    #[error("runtime handed out image {index} of a {count}-image swapchain")]
    ImageIndexOutOfRange { index: u32, count: usize },

    #[error("view poses could not be located")]
    PoseUnavailable,

    #[error("XR session lost or exiting")]
    SessionLost,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Application/engine identity sent at instance creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
}

/// Rigid transform: orientation quaternion (xyzw) and position (meters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub orientation: [f32; 4],
    pub position: [f32; 3],
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        orientation: [0.0, 0.0, 0.0, 1.0],
        position: [0.0, 0.0, 0.0],
    };
}

/// Field of view as tangent-space half angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl Fov {
    /// Symmetric frustum used when the runtime cannot supply one.
    pub const DEFAULT_SYMMETRIC: Fov = Fov {
        angle_left: -0.5,
        angle_right: 0.5,
        angle_up: 0.5,
        angle_down: -0.5,
    };
}

/// Where one eye is looking from, and how wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub pose: Pose,
    pub fov: Fov,
}

/// Recommended render target for one view of the primary stereo configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfigView {
    pub recommended_width: u32,
    pub recommended_height: u32,
}

/// Parameters for one per-eye swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub format: i64,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub face_count: u32,
    pub array_size: u32,
    pub mip_count: u32,
    pub sampled: bool,
    pub color_attachment: bool,
}

impl SwapchainDesc {
    /// Single-sample, single-mip, single-face color target.
    pub fn color_target(format: i64, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            sample_count: 1,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
            sampled: true,
            color_attachment: true,
        }
    }
}

/// What `wait_frame` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// Nanoseconds, in the runtime's clock.
    pub predicted_display_time: i64,
    pub predicted_display_period: i64,
    pub should_render: bool,
}

/// One eye's entry in a projection layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionView {
    pub swapchain: SwapchainHandle,
    pub view: EyeView,
    pub image_width: u32,
    pub image_height: u32,
}

/// The API contract of the platform XR runtime.
///
/// Destroy calls on a handle the runtime no longer knows are no-ops.
pub trait XrRuntime {
    fn create_instance(&mut self, identity: &AppIdentity) -> RuntimeResult<InstanceHandle>;
    fn destroy_instance(&mut self, instance: InstanceHandle);

    /// `Err(RuntimeError::FormFactorUnavailable)` when no headset is present.
    fn get_system(&mut self, instance: InstanceHandle) -> RuntimeResult<SystemHandle>;

    fn create_session(
        &mut self,
        instance: InstanceHandle,
        system: SystemHandle,
        binding: &GraphicsBinding,
    ) -> RuntimeResult<SessionHandle>;
    fn destroy_session(&mut self, session: SessionHandle);

    fn create_reference_space(
        &mut self,
        session: SessionHandle,
        pose_in_space: Pose,
    ) -> RuntimeResult<SpaceHandle>;
    fn destroy_space(&mut self, space: SpaceHandle);

    /// Views of the primary stereo configuration, in eye order.
    fn view_configuration(
        &mut self,
        instance: InstanceHandle,
        system: SystemHandle,
    ) -> RuntimeResult<Vec<ViewConfigView>>;

    /// Supported swapchain formats, in runtime preference order.
    fn swapchain_formats(&mut self, session: SessionHandle) -> RuntimeResult<Vec<i64>>;

    fn create_swapchain(
        &mut self,
        session: SessionHandle,
        desc: &SwapchainDesc,
    ) -> RuntimeResult<SwapchainHandle>;
    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle);
    fn enumerate_swapchain_images(
        &mut self,
        swapchain: SwapchainHandle,
    ) -> RuntimeResult<Vec<ImageHandle>>;

    /// Blocks until the compositor is ready for the next frame.
    fn wait_frame(&mut self, session: SessionHandle) -> RuntimeResult<FrameTiming>;
    fn begin_frame(&mut self, session: SessionHandle) -> RuntimeResult<()>;
    /// Submits `views` as one projection layer in `space`; no layer when empty.
    fn end_frame(
        &mut self,
        session: SessionHandle,
        display_time: i64,
        space: SpaceHandle,
        views: &[ProjectionView],
    ) -> RuntimeResult<()>;

    fn acquire_image(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<u32>;
    /// `None` waits without bound.
    fn wait_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout: Option<Duration>,
    ) -> RuntimeResult<()>;
    fn release_image(&mut self, swapchain: SwapchainHandle) -> RuntimeResult<()>;

    /// Eye views at `display_time`, in eye order.
    fn locate_views(
        &mut self,
        session: SessionHandle,
        space: SpaceHandle,
        display_time: i64,
    ) -> RuntimeResult<Vec<EyeView>>;
}
