pub mod cart;
pub mod customization;
pub mod product;
pub mod snapshot;

pub use cart::*;
pub use customization::*;
pub use product::*;
pub use snapshot::*;
