pub mod glb;
pub mod samples;
pub mod scene_loader;

pub use glb::*;
pub use scene_loader::*;
