//! Event loop and windows.
//!
//! Owns the `winit` event loop, creates one [`Gpu`](crate::device::Gpu) per
//! window and drives [`App`](crate::core::App) callbacks.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
