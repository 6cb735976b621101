//! Fallback policies. Each one silently substitutes something, so each one
//! is pinned by tests here.

use serde::Deserialize;

use super::runtime::{EyeView, Fov, Pose};

/// GL_RGBA8.
pub const PREFERRED_SWAPCHAIN_FORMAT: i64 = 0x8058;

/// Picks `preferred` when the runtime supports it, else the runtime's first
/// listed format. `None` only when the runtime lists nothing.
pub fn choose_swapchain_format(supported: &[i64], preferred: i64) -> Option<i64> {
    if supported.contains(&preferred) {
        Some(preferred)
    } else {
        supported.first().copied()
    }
}

/// View used when the runtime could not locate the eye this frame.
pub const FALLBACK_VIEW: EyeView = EyeView {
    pose: Pose::IDENTITY,
    fov: Fov::DEFAULT_SYMMETRIC,
};

/// The located view for `eye`, or `FALLBACK_VIEW` when none was located.
pub fn view_or_fallback(located: Option<&[EyeView]>, eye: usize) -> EyeView {
    located
        .and_then(|views| views.get(eye))
        .copied()
        .unwrap_or(FALLBACK_VIEW)
}

/// What EndFrame does when no eye has an image to compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleFrameSubmit {
    /// Close the frame with the runtime, carrying no layers.
    #[default]
    EndWithoutLayers,
    /// Skip the runtime end-frame call entirely.
    SkipEndFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_format_wins_when_supported() {
        assert_eq!(
            choose_swapchain_format(&[0x8C43, 0x8058, 0x881A], PREFERRED_SWAPCHAIN_FORMAT),
            Some(0x8058)
        );
    }

    #[test]
    fn first_listed_format_when_preferred_missing() {
        assert_eq!(
            choose_swapchain_format(&[0x8C43, 0x881A], PREFERRED_SWAPCHAIN_FORMAT),
            Some(0x8C43)
        );
    }

    #[test]
    fn no_format_when_runtime_lists_none() {
        assert_eq!(choose_swapchain_format(&[], PREFERRED_SWAPCHAIN_FORMAT), None);
    }

    #[test]
    fn fallback_view_is_identity_with_symmetric_fov() {
        let v = view_or_fallback(None, 0);
        assert_eq!(v.pose.orientation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(v.pose.position, [0.0; 3]);
        assert_eq!(v.fov.angle_left, -0.5);
        assert_eq!(v.fov.angle_right, 0.5);
        assert_eq!(v.fov.angle_up, 0.5);
        assert_eq!(v.fov.angle_down, -0.5);
    }

    #[test]
    fn short_located_list_falls_back_per_eye() {
        let located = [EyeView {
            pose: Pose {
                orientation: [0.0, 0.7071, 0.0, 0.7071],
                position: [-0.03, 1.6, 0.0],
            },
            fov: Fov {
                angle_left: -0.9,
                angle_right: 0.8,
                angle_up: 0.85,
                angle_down: -0.9,
            },
        }];
        assert_eq!(view_or_fallback(Some(&located), 0), located[0]);
        assert_eq!(view_or_fallback(Some(&located), 1), FALLBACK_VIEW);
    }

    #[test]
    fn idle_frame_submit_defaults_to_ending_the_frame() {
        assert_eq!(IdleFrameSubmit::default(), IdleFrameSubmit::EndWithoutLayers);
        let p: IdleFrameSubmit = serde_json::from_str("\"skip_end_frame\"").unwrap();
        assert_eq!(p, IdleFrameSubmit::SkipEndFrame);
    }
}
