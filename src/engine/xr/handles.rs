//! Capability handles.
//!
//! Opaque keys minted by an `XrRuntime` implementation. The VR subsystem
//! only stores and hands them back; what sits behind a key is the
//! runtime's business.

slotmap::new_key_type! {
    /// Connection to the XR runtime.
    pub struct InstanceHandle;
    /// Head-mounted display system discovered on an instance.
    pub struct SystemHandle;
    /// Rendering session, owned by an instance.
    pub struct SessionHandle;
    /// Reference space, owned by a session.
    pub struct SpaceHandle;
    /// Per-eye image ring, owned by a session.
    pub struct SwapchainHandle;
}

/// Renderer-visible image backing one swapchain slot (a GL texture name,
/// a console surface pointer, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);
