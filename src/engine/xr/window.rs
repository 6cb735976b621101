//! What the VR subsystem needs from the windowing layer.

use std::sync::Arc;

use winit::window::Window;

use crate::engine::{EngineError, EngineResult};

/// Raw GL rendering context (an HGLRC on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlContextId(pub usize);

/// Platform drawable pulled from a native window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeDrawable {
    /// Win32 device context (HDC).
    Win32Dc(usize),
}

/// A GL context the VR subsystem created and therefore owns. Dropping it
/// destroys the context.
pub trait GraphicsContext {
    fn id(&self) -> GlContextId;
}

pub trait PlatformWindow {
    fn native_drawable(&self) -> Option<NativeDrawable>;

    /// Context already current for this window, if any. Borrowed, never destroyed by us.
    fn current_gl_context(&self) -> Option<GlContextId>;

    fn create_gl_context(&mut self) -> EngineResult<Box<dyn GraphicsContext>>;
}

/// `PlatformWindow` over a winit window.
///
/// winit creates no GL contexts. A context already current on the render
/// thread is borrowed; otherwise one is created on the window's DC, made
/// current, and handed to the session to own.
pub struct WinitWindow {
    window: Arc<Window>,
    #[cfg(windows)]
    dc: Option<win32::WindowDc>,
}

impl WinitWindow {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            #[cfg(windows)]
            dc: win32::WindowDc::for_window(&window),
            window,
        }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl PlatformWindow for WinitWindow {
    #[cfg(windows)]
    fn native_drawable(&self) -> Option<NativeDrawable> {
        self.dc.as_ref().map(|dc| NativeDrawable::Win32Dc(dc.raw()))
    }

    #[cfg(not(windows))]
    fn native_drawable(&self) -> Option<NativeDrawable> {
        None
    }

    #[cfg(windows)]
    fn current_gl_context(&self) -> Option<GlContextId> {
        win32::current_context()
    }

    #[cfg(not(windows))]
    fn current_gl_context(&self) -> Option<GlContextId> {
        None
    }

    #[cfg(windows)]
    fn create_gl_context(&mut self) -> EngineResult<Box<dyn GraphicsContext>> {
        let dc = self.dc.as_ref().ok_or_else(|| {
            EngineError::GraphicsContext("window has no Win32 device context".to_string())
        })?;
        let context = win32::GlContext::new(dc)?;
        Ok(Box::new(context))
    }

    #[cfg(not(windows))]
    fn create_gl_context(&mut self) -> EngineResult<Box<dyn GraphicsContext>> {
        Err(EngineError::GraphicsContext(
            "GL contexts are only created on Win32".to_string(),
        ))
    }
}

#[cfg(windows)]
mod win32 {
    use std::mem;

    use tracing::debug;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{GetDC, HDC, ReleaseDC};
    use windows::Win32::Graphics::OpenGL::{
        ChoosePixelFormat, GetPixelFormat, HGLRC, PFD_DOUBLEBUFFER, PFD_DRAW_TO_WINDOW,
        PFD_SUPPORT_OPENGL, PFD_TYPE_RGBA, PIXELFORMATDESCRIPTOR, SetPixelFormat, wglCreateContext,
        wglDeleteContext, wglGetCurrentContext, wglMakeCurrent,
    };
    use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
    use winit::window::Window;

    use super::{GlContextId, GraphicsContext};
    use crate::engine::{EngineError, EngineResult};

    /// A window's device context, released with the window.
    pub struct WindowDc {
        hwnd: HWND,
        hdc: HDC,
    }

    impl WindowDc {
        pub fn for_window(window: &Window) -> Option<Self> {
            let handle = window.window_handle().ok()?;
            let RawWindowHandle::Win32(h) = handle.as_raw() else {
                return None;
            };
            let hwnd = HWND(h.hwnd.get() as *mut _);
            let hdc = unsafe { GetDC(Some(hwnd)) };
            (!hdc.is_invalid()).then_some(Self { hwnd, hdc })
        }

        pub fn raw(&self) -> usize {
            self.hdc.0 as usize
        }
    }

    impl Drop for WindowDc {
        fn drop(&mut self) {
            unsafe { ReleaseDC(Some(self.hwnd), self.hdc) };
        }
    }

    pub fn current_context() -> Option<GlContextId> {
        let ctx = unsafe { wglGetCurrentContext() };
        (!ctx.is_invalid()).then(|| GlContextId(ctx.0 as usize))
    }

    /// GL context created for the VR session. Current on the render thread
    /// while it lives; deleted on drop.
    pub struct GlContext {
        hglrc: HGLRC,
    }

    impl GlContext {
        pub fn new(dc: &WindowDc) -> EngineResult<Self> {
            ensure_pixel_format(dc.hdc)?;
            let hglrc = unsafe { wglCreateContext(dc.hdc) }.map_err(gl_error)?;
            if let Err(e) = unsafe { wglMakeCurrent(dc.hdc, hglrc) } {
                unsafe { _ = wglDeleteContext(hglrc) };
                return Err(gl_error(e));
            }
            debug!("VR: created GL context {:?}", hglrc.0);
            Ok(Self { hglrc })
        }
    }

    impl GraphicsContext for GlContext {
        fn id(&self) -> GlContextId {
            GlContextId(self.hglrc.0 as usize)
        }
    }

    impl Drop for GlContext {
        fn drop(&mut self) {
            unsafe {
                if wglGetCurrentContext() == self.hglrc {
                    _ = wglMakeCurrent(HDC::default(), HGLRC::default());
                }
                _ = wglDeleteContext(self.hglrc);
            }
        }
    }

    /// A DC needs a pixel format before a GL context can be created on it.
    fn ensure_pixel_format(hdc: HDC) -> EngineResult<()> {
        if unsafe { GetPixelFormat(hdc) } != 0 {
            return Ok(());
        }
        let pfd = PIXELFORMATDESCRIPTOR {
            nSize: mem::size_of::<PIXELFORMATDESCRIPTOR>() as u16,
            nVersion: 1,
            dwFlags: PFD_DRAW_TO_WINDOW | PFD_SUPPORT_OPENGL | PFD_DOUBLEBUFFER,
            iPixelType: PFD_TYPE_RGBA,
            cColorBits: 32,
            cDepthBits: 24,
            cStencilBits: 8,
            ..Default::default()
        };
        let format = unsafe { ChoosePixelFormat(hdc, &pfd) };
        if format == 0 {
            return Err(EngineError::GraphicsContext(
                "no matching pixel format".to_string(),
            ));
        }
        unsafe { SetPixelFormat(hdc, format, &pfd) }.map_err(gl_error)
    }

    fn gl_error(e: windows::core::Error) -> EngineError {
        EngineError::GraphicsContext(e.to_string())
    }
}
