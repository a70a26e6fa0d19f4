//! Verger engine.
//!
//! Rendering core of a 2D game framework: a transform scene graph, packed
//! draw-order keys, a state-sorting renderer and a texture-batched sprite
//! batch, plus the fixed-step timeline and the window/GPU runtime that
//! drive them.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
