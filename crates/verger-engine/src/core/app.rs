use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

/// What the runtime should do after an app callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Game-side callbacks driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Raw window events, before the runtime handles them.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// The drawable size changed; the surface has already been reconfigured.
    fn on_resize(&mut self, window_id: WindowId, size: PhysicalSize<u32>) {
        let _ = (window_id, size);
    }

    /// One call per presented frame per window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
