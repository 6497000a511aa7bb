pub mod mat;
pub mod quat;
pub mod vec;

pub use mat::*;
pub use quat::*;
pub use vec::*;
