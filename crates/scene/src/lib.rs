pub mod components;
pub mod geometry;
pub mod graph;
pub mod normalize;
pub mod prefabs;

pub use geometry::*;
pub use graph::*;
pub use normalize::*;
