//! Frame submission counters.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames closed with the compositor.
    pub frames_submitted: u64,
    /// Wait-for-frame failures; the frame is skipped.
    pub frames_dropped: u64,
    pub begin_failures: u64,
    pub end_failures: u64,
    /// Swapchain image acquire, wait or release failures.
    pub image_failures: u64,
    /// Eye views carried by submitted projection layers.
    pub eyes_submitted: u64,
    /// Composed eyes submitted with the fallback view.
    pub pose_fallbacks: u64,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted={} dropped={} begin_failed={} end_failed={} image_failed={} eyes={} pose_fallbacks={}",
            self.frames_submitted,
            self.frames_dropped,
            self.begin_failures,
            self.end_failures,
            self.image_failures,
            self.eyes_submitted,
            self.pose_fallbacks,
        )
    }
}
