pub mod config;
pub mod deep_link;
pub mod error;
pub mod platform;
pub mod qr;
pub mod router;

pub use config::*;
pub use deep_link::*;
pub use error::*;
pub use platform::*;
pub use qr::*;
pub use router::*;
