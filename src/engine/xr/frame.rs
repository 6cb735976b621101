//! Frame controller.
//!
//! One frame at a time, on the render thread:
//!
//! `Idle -> Waited -> Begun -> [acquire(e) -> release(e)]* -> end -> Idle`
//!
//! `wait_for_frame` is the only call that blocks on the compositor. Once
//! `begin_frame` succeeds the caller must reach `end_frame` before the next
//! wait, even if nothing was rendered.

use tracing::{debug, warn};

use super::context::VrSessionContext;
use super::handles::ImageHandle;
use super::policy::{IdleFrameSubmit, view_or_fallback};
use super::runtime::{EyeView, FrameTiming, ProjectionView, RuntimeError, XrRuntime};
use crate::engine::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Waited,
    Begun,
}

impl FramePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            FramePhase::Idle => "idle",
            FramePhase::Waited => "waited",
            FramePhase::Begun => "begun",
        }
    }
}

impl<R: XrRuntime> VrSessionContext<R> {
    pub fn frame_phase(&self) -> FramePhase {
        self.phase
    }

    /// Timing of the frame in flight; `None` between frames.
    pub fn frame_timing(&self) -> Option<FrameTiming> {
        self.frame_timing
    }

    /// Blocks until the compositor accepts a new frame. An error is a
    /// dropped frame: skip rendering and try again next tick.
    pub fn wait_for_frame(&mut self) -> EngineResult<FrameTiming> {
        self.ensure_initialized()?;
        self.expect_phase("wait_for_frame", FramePhase::Idle)?;
        let session = self.session.ok_or(EngineError::NotInitialized)?;

        match self.runtime.wait_frame(session) {
            Ok(timing) => {
                self.frame_timing = Some(timing);
                self.phase = FramePhase::Waited;
                Ok(timing)
            }
            Err(e) => {
                self.stats.frames_dropped += 1;
                log_transient(self.stats.frames_dropped, "wait_frame failed, dropping frame", &e);
                Err(e.into())
            }
        }
    }

    /// Opens the waited frame for submission and locates this frame's views.
    pub fn begin_frame(&mut self) -> EngineResult<()> {
        self.ensure_initialized()?;
        self.expect_phase("begin_frame", FramePhase::Waited)?;
        let (Some(session), Some(space), Some(timing)) =
            (self.session, self.reference_space, self.frame_timing)
        else {
            return Err(EngineError::NotInitialized);
        };

        if let Err(e) = self.runtime.begin_frame(session) {
            self.stats.begin_failures += 1;
            log_transient(self.stats.begin_failures, "begin_frame failed, skipping frame", &e);
            self.phase = FramePhase::Idle;
            self.frame_timing = None;
            return Err(e.into());
        }
        self.phase = FramePhase::Begun;

        self.located_views = match self
            .runtime
            .locate_views(session, space, timing.predicted_display_time)
        {
            Ok(views) => Some(views),
            Err(e) => {
                debug!("VR: views not locatable this frame ({e}); using fallback view");
                None
            }
        };
        Ok(())
    }

    /// Checks that `eye` can be rendered to.
    pub fn bind_eye(&self, eye: usize) -> EngineResult<()> {
        self.ensure_initialized()?;
        self.eyes.get(eye).map(|_| ())
    }

    /// Negotiated swapchain size for `eye`.
    pub fn eye_extent(&self, eye: usize) -> EngineResult<(u32, u32)> {
        self.ensure_initialized()?;
        Ok(self.eyes.get(eye)?.extent())
    }

    /// Checks out the next writable image of `eye`'s swapchain.
    ///
    /// A second acquire for the same eye before it is released is rejected.
    pub fn acquire_eye_image(&mut self, eye: usize) -> EngineResult<ImageHandle> {
        self.bind_eye(eye)?;
        self.expect_phase("acquire_eye_image", FramePhase::Begun)?;
        if self.eyes.is_acquired(eye) {
            return Err(EngineError::EyeAlreadyAcquired(eye));
        }

        let res = self.eyes.get(eye)?;
        let swapchain = res.swapchain();
        let image_count = res.images().len();

        let index = match self.runtime.acquire_image(swapchain) {
            Ok(index) => index,
            Err(e) => {
                self.stats.image_failures += 1;
                log_transient(
                    self.stats.image_failures,
                    &format!("eye {eye}: image acquire failed"),
                    &e,
                );
                return Err(e.into());
            }
        };

        let timeout = self.config.image_wait_timeout();
        let ready = self
            .runtime
            .wait_image(swapchain, timeout)
            .and_then(|()| {
                if (index as usize) < image_count {
                    Ok(())
                } else {
                    Err(RuntimeError::ImageIndexOutOfRange {
                        index,
                        count: image_count,
                    })
                }
            });
        if let Err(e) = ready {
            self.stats.image_failures += 1;
            log_transient(
                self.stats.image_failures,
                &format!("eye {eye}: image wait failed, releasing slot"),
                &e,
            );
            if let Err(release) = self.runtime.release_image(swapchain) {
                debug!("VR: release after failed wait on eye {eye}: {release}");
            }
            return Err(e.into());
        }

        self.eyes.mark_acquired(eye, index);
        Ok(self.eyes.get(eye)?.images()[index as usize])
    }

    /// Hands `eye`'s image back to the runtime; it is composed at `end_frame`.
    pub fn release_eye_image(&mut self, eye: usize) -> EngineResult<()> {
        self.bind_eye(eye)?;
        if !self.eyes.is_acquired(eye) {
            return Err(EngineError::EyeNotAcquired(eye));
        }
        let swapchain = self.eyes.get(eye)?.swapchain();
        if let Err(e) = self.runtime.release_image(swapchain) {
            self.stats.image_failures += 1;
            log_transient(
                self.stats.image_failures,
                &format!("eye {eye}: image release failed"),
                &e,
            );
            return Err(e.into());
        }
        self.eyes.mark_released(eye);
        Ok(())
    }

    /// Submits the frame and resets all acquisition state, whether or not
    /// the submission worked.
    pub fn end_frame(&mut self) -> EngineResult<()> {
        self.ensure_initialized()?;
        let result = match self.phase {
            FramePhase::Begun => self.submit_frame(),
            phase => Err(EngineError::FrameOutOfOrder {
                call: "end_frame",
                phase: phase.as_str(),
            }),
        };
        self.eyes.reset_checkouts();
        self.phase = FramePhase::Idle;
        self.frame_timing = None;
        result
    }

    fn submit_frame(&mut self) -> EngineResult<()> {
        let (Some(session), Some(space), Some(timing)) =
            (self.session, self.reference_space, self.frame_timing)
        else {
            return Err(EngineError::NotInitialized);
        };

        // Eyes still checked out are released here so they can be composed.
        for eye in 0..self.eyes.len() {
            if !self.eyes.is_acquired(eye) {
                continue;
            }
            let swapchain = self.eyes.get(eye)?.swapchain();
            match self.runtime.release_image(swapchain) {
                Ok(()) => self.eyes.mark_released(eye),
                Err(e) => {
                    self.stats.image_failures += 1;
                    log_transient(
                        self.stats.image_failures,
                        &format!("eye {eye}: implicit release failed, eye not composed"),
                        &e,
                    );
                }
            }
        }

        let mut views = Vec::with_capacity(self.eyes.len());
        for (eye, res) in self.eyes.iter().enumerate() {
            if self.eyes.released_index(eye).is_none() {
                continue;
            }
            let located = self.located_views.as_deref();
            if located.and_then(|v| v.get(eye)).is_none() {
                self.stats.pose_fallbacks += 1;
            }
            let (image_width, image_height) = res.extent();
            views.push(ProjectionView {
                swapchain: res.swapchain(),
                view: view_or_fallback(located, eye),
                image_width,
                image_height,
            });
        }

        if views.is_empty() && self.config.idle_frame_submit == IdleFrameSubmit::SkipEndFrame {
            debug!("VR: nothing to compose; skipping end_frame");
            return Ok(());
        }

        match self
            .runtime
            .end_frame(session, timing.predicted_display_time, space, &views)
        {
            Ok(()) => {
                self.stats.frames_submitted += 1;
                self.stats.eyes_submitted += views.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.stats.end_failures += 1;
                log_transient(self.stats.end_failures, "end_frame failed", &e);
                Err(e.into())
            }
        }
    }

    /// World-to-eye matrix for this frame, column-major.
    pub fn eye_view_matrix(&self, eye: usize) -> EngineResult<[f32; 16]> {
        Ok(super::matrices::view_matrix(&self.current_view(eye)?))
    }

    /// GL clip-space projection for this frame, column-major.
    pub fn eye_projection_matrix(&self, eye: usize) -> EngineResult<[f32; 16]> {
        let view = self.current_view(eye)?;
        Ok(super::matrices::projection_matrix(
            &view.fov,
            self.config.near_plane,
            self.config.far_plane,
        ))
    }

    /// Located view for `eye`, or the fallback view.
    pub fn current_view(&self, eye: usize) -> EngineResult<EyeView> {
        self.bind_eye(eye)?;
        Ok(view_or_fallback(self.located_views.as_deref(), eye))
    }

    pub(super) fn reset_frame_state(&mut self) {
        self.eyes.reset_checkouts();
        self.phase = FramePhase::Idle;
        self.frame_timing = None;
        self.located_views = None;
    }

    fn ensure_initialized(&self) -> EngineResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn expect_phase(&self, call: &'static str, expected: FramePhase) -> EngineResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::FrameOutOfOrder {
                call,
                phase: self.phase.as_str(),
            })
        }
    }
}

/// First failure of a kind is a warning; repeats go to debug.
fn log_transient(occurrences: u64, what: &str, error: &RuntimeError) {
    if occurrences <= 1 {
        warn!("VR: {what}: {error}");
    } else {
        debug!("VR: {what} (x{occurrences}): {error}");
    }
}
