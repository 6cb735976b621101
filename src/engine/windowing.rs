use std::sync::Arc;

use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::engine::config::VrConfig;
use crate::engine::graphics::{HeadlessBackend, StereoRenderer, create_device};
use crate::engine::xr::{OpenXrRuntime, WinitWindow};
use crate::engine::{EngineError, EngineResult};

type Device = StereoRenderer<HeadlessBackend, OpenXrRuntime>;

/// winit event loop driving the rendering device (ApplicationHandler style).
pub struct Windowing;

impl Windowing {
    pub fn run_app(config: VrConfig) -> EngineResult<()> {
        let event_loop = EventLoop::new().map_err(|e| EngineError::Windowing(e.to_string()))?;
        // The compositor paces VR frames; mono frames are paced by redraw requests.
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            config,
            device: None,
            window: None,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| EngineError::Windowing(e.to_string()))?;

        Ok(())
    }
}

// Field order is drop order: the device (and any GL context it owns) goes
// before the window's DC.
struct App {
    config: VrConfig,
    device: Option<Device>,
    window: Option<WinitWindow>,
}

impl App {
    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        // VR goes down before the window it is bound to.
        if let Some(mut device) = self.device.take() {
            device.shutdown_vr();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs: WindowAttributes = Window::default_attributes()
            .with_title("stereo-shim")
            .with_inner_size(winit::dpi::LogicalSize::new(1024.0, 768.0));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let mut platform_window = WinitWindow::new(window);
        let backend = HeadlessBackend::new(self.config.renderer);
        let mut device = create_device(
            &mut platform_window,
            backend,
            OpenXrRuntime::new(),
            self.config.clone(),
        );
        device.resize(platform_window.window().inner_size());
        info!(
            "device created ({})",
            if device.is_stereo() { "stereo" } else { "mono" }
        );

        platform_window.window().request_redraw();
        self.window = Some(platform_window);
        self.device = Some(device);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.exit(event_loop),

            WindowEvent::Resized(size) => {
                if let Some(device) = self.device.as_mut() {
                    device.resize(size);
                }
                if let Some(w) = &self.window {
                    w.window().request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(device) = self.device.as_mut() else {
                    return;
                };

                let result = device.begin_frame().and_then(|()| device.finalize_frame());
                if let Err(e) = result {
                    warn!("frame failed: {e}");
                }

                if let Some(w) = &self.window {
                    w.window().pre_present_notify();
                    w.window().request_redraw();
                }
            }

            _ => {}
        }
    }
}
