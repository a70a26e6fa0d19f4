//! GPU device and window surface.
//!
//! Creates the wgpu device/queue, configures the swapchain and its depth
//! target, and hands out per-frame encoders.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use surface::DEPTH_FORMAT;
