//! Rendering subsystem.
//!
//! Responsibilities:
//! - order renderables and minimize render-state switches (`Renderer`)
//! - batch sprites into one draw per texture (`SpriteBatch`)
//! - abstract the GPU behind `RenderBackend`; `WgpuBackend` records into a
//!   frame's command encoder
//!
//! Convention:
//! - world space is +Y up; cameras supply view and projection matrices
//! - vertex `z` carries the sprite layer, resolved by the depth test

mod backend;
mod batch;
mod camera;
mod ctx;
mod gpu;
mod renderer;
mod texture;

pub use backend::{RenderBackend, SpriteVertex, VertexBuffer};
pub use batch::{BatchError, BuildStats, SpriteBatch, SpriteId, SpriteMut, VERTICES_PER_SPRITE};
pub use camera::{Camera, OrthographicCamera, PerspectiveCamera, ZOOM_RANGE};
pub use ctx::{RenderCtx, RenderTarget};
pub use gpu::{SpriteResources, WgpuBackend};
pub use renderer::{DrawCtx, RenderStats, Renderable, Renderer, SharedRenderable};
pub use texture::{Texture, TextureCache, TextureError, TextureId};

#[cfg(test)]
pub(crate) use backend::testing;
#[cfg(test)]
pub(crate) use texture::test_support;
