//! Geometry types shared by the scene graph, sprites and cameras.
//!
//! World space is +X right, +Y up; matrices are column-major and follow the
//! column-vector convention, so `parent * child` applies the child first.

mod mat4;
mod rect;
mod vec2;

pub use mat4::Mat4;
pub use rect::Rect;
pub use vec2::Vec2;
