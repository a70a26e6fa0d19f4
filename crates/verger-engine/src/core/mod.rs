//! Contracts between the runtime loop and the game.
//!
//! `App` is what the runtime calls; `FrameCtx` is what a frame gets;
//! `GameContext` runs the per-game systems in frame order.

mod app;
mod ctx;
mod game;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
pub use game::{Component, GameContext};
