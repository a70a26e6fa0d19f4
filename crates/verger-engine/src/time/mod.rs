//! Time subsystem.
//!
//! - `FrameClock`: real frame deltas, one clock per window
//! - `Timeline`: fixed-step simulation driving `Advance` participants
//! - `TaskQueue` / `TaskManager`: scripted sequences of actions and waits

mod frame_clock;
mod tasks;
mod timeline;

pub use frame_clock::{FrameClock, FrameTime};
pub use tasks::{TaskManager, TaskQueue, UntilPredicate};
pub use timeline::{Advance, Animate, SharedAdvance, SharedAnimate, Timeline, TimelineSettings};
