pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod request;
pub mod state;

pub use config::*;
pub use error::*;
pub use fetch::*;
pub use loader::*;
pub use request::*;
pub use state::*;
