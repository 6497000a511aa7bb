pub mod renderer;
pub mod residency;
pub mod surface;

pub use renderer::*;
pub use residency::*;
pub use surface::*;
