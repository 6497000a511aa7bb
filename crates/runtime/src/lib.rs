pub mod device;
pub mod event_bus;
pub mod timers;

pub use device::*;
pub use event_bus::*;
pub use timers::*;
