//! In-memory level model

mod entity;
mod level;
mod lightmap;
mod material;
mod movement;
mod transform;

pub use entity::*;
pub use level::*;
pub use lightmap::*;
pub use material::*;
pub use movement::*;
pub use transform::*;
