use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{RenderBackend, RenderCtx, RenderTarget, SpriteResources, WgpuBackend};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Window size in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let logical: winit::dpi::LogicalSize<f64> =
            self.window.inner_size().to_logical(self.window.scale_factor());
        (logical.width as f32, logical.height as f32)
    }
}

/// Per-frame context handed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` spans the callback; `'w` is the window borrow held by [`Gpu`].
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Acquires the next surface image, hands `draw` a backend recording into
    /// it, then presents.
    ///
    /// Surface errors skip the frame; only a fatal one returns
    /// [`AppControl::Exit`].
    pub fn render<F>(&mut self, resources: &mut SpriteResources, draw: F) -> AppControl
    where
        F: FnOnce(&mut dyn RenderBackend),
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("surface lost beyond recovery");
                        AppControl::Exit
                    }
                    _ => AppControl::Continue,
                };
            }
        };

        {
            let gpu = &*self.gpu;
            let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format());
            let target = RenderTarget::new(&mut frame.encoder, &frame.view, gpu.depth_view());
            let mut backend = WgpuBackend::new(ctx, target, resources);
            draw(&mut backend);
        }

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
