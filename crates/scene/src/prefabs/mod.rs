pub mod placeholder;

pub use placeholder::*;
