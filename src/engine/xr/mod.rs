//! Stereoscopic VR presentation.
//!
//! `VrSessionContext` owns every runtime handle for one rendering device.
//! The lifecycle half (`initialize` / `shutdown`) builds and tears it down;
//! the frame half drives wait → begin → per-eye acquire/release → end.

pub mod binding;
pub mod context;
pub mod eye;
pub mod frame;
pub mod frame_stats;
pub mod handles;
pub mod lifecycle;
pub mod matrices;
pub mod openxr_runtime;
pub mod policy;
pub mod probe;
pub mod runtime;
pub mod window;

#[cfg(test)]
pub(crate) mod fake_runtime;

pub use binding::{GraphicsBinding, RendererKind};
pub use context::VrSessionContext;
pub use handles::ImageHandle;
pub use lifecycle::{Availability, InitStage};
pub use openxr_runtime::OpenXrRuntime;
pub use policy::{IdleFrameSubmit, PREFERRED_SWAPCHAIN_FORMAT};
pub use probe::probe_headset;
pub use runtime::{AppIdentity, RuntimeError, XrRuntime};
pub use window::{PlatformWindow, WinitWindow};
