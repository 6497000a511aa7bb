pub mod config;
pub mod session;
pub mod status;

pub use config::*;
pub use session::*;
pub use status::*;
