//! Scene data: transforms, sprites and draw ordering.
//!
//! Responsibilities:
//! - resolve parent/child transforms once per pass (`TransformTree`)
//! - describe textured quads (`Sprite`) and grids of them (`SpriteGrid`)
//! - pack draw-order inputs into a sortable 64-bit key (`DrawOrderKey`)
//!
//! Nothing here talks to the GPU; see `render` for that.

mod error;
mod grid;
mod key;
mod sprite;
mod transform;

pub use error::{GridError, OrderKeyError};
pub use grid::{GridCell, SpriteGrid, SpriteGridSettings};
pub use key::{DrawOrder, DrawOrderKey, MAX_LAYER, MAX_LAYER_DEPTH, RenderState};
pub use sprite::Sprite;
pub use transform::{MAX_PARENT_DEPTH, NodeId, TransformNode, TransformTree};
