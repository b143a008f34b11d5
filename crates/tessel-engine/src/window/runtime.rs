use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tessel".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Requests a frame callback can make of the runtime. They take effect once
/// the callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Entry point for the runtime: one window, one surface, one app.
pub struct Runtime;

impl Runtime {
    /// Opens the window on the first `resumed` and drives `app` until the
    /// window closes or the app asks to exit.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = Driver { config, gpu_init, app, surface: None, failed: None };
        event_loop.run_app(&mut state).context("winit event loop terminated with error")?;

        match state.failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// The window together with the surface that borrows it.
#[self_referencing]
struct Surface {
    input: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl Surface {
    fn open(event_loop: &ActiveEventLoop, config: &RuntimeConfig, gpu_init: GpuInit) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);
        let window = event_loop.create_window(attrs).context("failed to create window")?;
        log::info!("window `{}` opened at {:?}", config.title, window.inner_size());

        SurfaceTryBuilder {
            input: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")
    }

    fn id(&self) -> WindowId {
        self.with_window(|w| w.id())
    }

    fn request_redraw(&self) {
        self.with_window(|w| w.request_redraw());
    }
}

struct Driver<A: CoreApp + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,
    surface: Option<Surface>,
    /// Startup failure reported from `run` once the loop has exited.
    failed: Option<anyhow::Error>,
}

impl<A: CoreApp + 'static> Driver<A> {
    /// Reconfigures the surface to the window's size and tells the app the
    /// new logical size.
    fn resize(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let (physical, scale) = surface.with_window(|w| (w.inner_size(), w.scale_factor()));
        surface.with_gpu_mut(|gpu| gpu.resize(physical));
        surface.request_redraw();

        let logical: LogicalSize<f64> = physical.to_logical(scale);
        let id = surface.id();
        self.app.on_resize(id, logical.width as f32, logical.height as f32);
    }

    /// Drives one frame. Returns `true` when the app wants to stop.
    fn redraw(&mut self) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let app = &mut self.app;
        let mut runtime = RuntimeCtx::default();

        let control = surface.with_mut(|fields| {
            let mut ctx = FrameCtx {
                window: WindowCtx { id: fields.window.id(), window: fields.window },
                gpu: fields.gpu,
                input: fields.input,
                input_frame: fields.input_frame,
                time: fields.clock.tick(),
                runtime: &mut runtime,
            };
            let control = app.on_frame(&mut ctx);
            fields.input_frame.clear();
            control
        });

        control == AppControl::Exit || runtime.exit_requested()
    }
}

impl<A: CoreApp + 'static> ApplicationHandler for Driver<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        match Surface::open(event_loop, &self.config, self.gpu_init.clone()) {
            Ok(surface) => {
                surface.request_redraw();
                self.surface = Some(surface);
            }
            Err(e) => {
                log::error!("failed to open window: {e:#}");
                self.failed = Some(e);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        // Redraw continuously; the canvas only re-resolves what changed.
        if let Some(surface) = &self.surface {
            surface.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let app = &mut self.app;
        let Some(surface) = self.surface.as_mut().filter(|s| s.id() == window_id) else {
            return;
        };

        let control = surface.with_mut(|fields| {
            if let Some(ev) = translate_window_event(fields.window, fields.input, &event) {
                fields.input.apply_event(fields.input_frame, ev);
            }
            app.on_window_event(window_id, &event)
        });
        if control == AppControl::Exit {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.surface = None;
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.resize(),
            WindowEvent::RedrawRequested => {
                if self.redraw() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}
