pub mod headless;
pub mod renderer;
pub mod stereo;

pub use headless::HeadlessBackend;
pub use renderer::{EyeTarget, RenderBackend};
pub use stereo::{StereoRenderer, create_device};
