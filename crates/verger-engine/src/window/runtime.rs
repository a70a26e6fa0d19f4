use std::collections::HashMap;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::FrameClock;

/// Settings for one game window.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "verger".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            resizable: true,
        }
    }
}

/// Requests an app makes during a frame. Applied once the callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn open_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::OpenWindow(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::CloseWindow(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    OpenWindow(RuntimeConfig),
    CloseWindow(WindowId),
    Exit,
}

/// Owns the event loop; redraws every window continuously.
pub struct Runtime;

impl Runtime {
    /// Blocks until the last window closes or the app asks to exit.
    pub fn run<A>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit event loop")?;
        let mut state = LoopState::new(initial, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("event loop exited with an error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct LoopState<A: App + 'static> {
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    windows: HashMap<WindowId, WindowEntry>,
    exit_requested: bool,
}

impl<A: App + 'static> LoopState<A> {
    fn new(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            initial,
            gpu_init,
            app,
            windows: HashMap::new(),
            exit_requested: false,
        }
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop, config: RuntimeConfig) -> Result<WindowId> {
        let attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size)
            .with_resizable(config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let id = window.id();
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::new(),
            window,
            gpu_builder: |window| pollster::block_on(Gpu::new(window, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        log::info!("opened window {id:?}");
        self.windows.insert(id, entry);
        Ok(id)
    }

    fn resize(&mut self, id: WindowId, size: PhysicalSize<u32>) {
        let Some(entry) = self.windows.get_mut(&id) else {
            return;
        };
        entry.with_gpu_mut(|gpu| gpu.resize(size));
        entry.with_window(|w| w.request_redraw());
        if size.width > 0 && size.height > 0 {
            self.app.on_resize(id, size);
        }
    }

    fn redraw(&mut self, id: WindowId) -> RuntimeCtx {
        let mut runtime = RuntimeCtx::default();
        let Some(entry) = self.windows.get_mut(&id) else {
            return runtime;
        };

        let app = &mut self.app;
        let control = entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id,
                    window: fields.window,
                },
                gpu: fields.gpu,
                time,
                runtime: &mut runtime,
            };
            app.on_frame(&mut ctx)
        });

        if control == AppControl::Exit {
            runtime.exit();
        }
        runtime
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, mut runtime: RuntimeCtx) {
        for command in runtime.commands.drain(..) {
            match command {
                Command::OpenWindow(config) => {
                    if let Err(e) = self.open_window(event_loop, config) {
                        log::error!("failed to open window: {e:#}");
                        self.exit_requested = true;
                    }
                }
                Command::CloseWindow(id) => {
                    self.windows.remove(&id);
                }
                Command::Exit => self.exit_requested = true,
            }
        }

        if self.windows.is_empty() {
            self.exit_requested = true;
        }
    }
}

impl<A: App + 'static> ApplicationHandler for LoopState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }

        if let Err(e) = self.open_window(event_loop, self.initial.clone()) {
            log::error!("failed to open initial window: {e:#}");
            self.exit_requested = true;
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Poll);
        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if !self.windows.contains_key(&window_id) {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.exit_requested = true;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.windows.remove(&window_id);
                if self.windows.is_empty() {
                    self.exit_requested = true;
                }
            }
            WindowEvent::Resized(size) => self.resize(window_id, size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.windows.get(&window_id).map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(window_id, size);
                }
            }
            WindowEvent::RedrawRequested => {
                let runtime = self.redraw(window_id);
                self.apply(event_loop, runtime);
            }
            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
