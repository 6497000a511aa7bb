pub mod config;
pub mod controller;
pub mod orbit;
pub mod presets;
pub mod rotating;

pub use config::*;
pub use controller::*;
pub use orbit::*;
pub use presets::*;
pub use rotating::*;
