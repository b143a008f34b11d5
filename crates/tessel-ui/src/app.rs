use winit::dpi::LogicalSize;
use winit::window::WindowId;

use anyhow::Context;

use tessel_engine::core::{App as EngineApp, AppControl, FrameCtx};
use tessel_engine::device::GpuInit;
use tessel_engine::gpu::GraphicsDevice;
use tessel_engine::paint::Color;
use tessel_engine::text::{Font, FontBitmap};
use tessel_engine::time::FrameTime;
use tessel_engine::window::{Runtime, RuntimeConfig};

use crate::canvas::{Canvas, CanvasConfig};
use crate::input::UiInput;
use crate::tree::ElementId;
use crate::widgets::{UiPrograms, WidgetCtx};

type SetupFn = Box<dyn FnOnce(&mut AppCtx<'_>) -> anyhow::Result<()>>;
type UpdateFn = Box<dyn FnMut(&mut AppCtx<'_>) -> anyhow::Result<()>>;

// ── AppCtx ────────────────────────────────────────────────────────────────

/// What the setup and update hooks get to work with.
pub struct AppCtx<'a> {
    pub canvas: &'a mut Canvas,
    pub dev: &'a mut GraphicsDevice,
    pub programs: &'a UiPrograms,
    /// The baked font, if the application was given one.
    pub font: Option<&'a FontBitmap>,
    pub time: FrameTime,
}

impl AppCtx<'_> {
    pub fn root(&self) -> ElementId {
        self.canvas.root()
    }

    /// Builder context over the canvas tree.
    pub fn widgets(&mut self) -> WidgetCtx<'_> {
        WidgetCtx::new(self.canvas.tree_mut(), self.dev, self.programs)
    }
}

// ── Application ───────────────────────────────────────────────────────────

/// Top-level UI application builder.
///
/// Configure the window and font, register a setup hook that builds the
/// element tree and an optional per-frame hook, then start the event loop
/// with [`run`](Self::run).
///
/// ```rust,ignore
/// Application::new()
///     .title("Tessel")
///     .font(std::fs::read("font.ttf")?)
///     .setup(|cx| {
///         let root = cx.root();
///         Panel::new(Color::WHITE).place(Placement::stretch(Edges::all(20))).build(&mut cx.widgets(), root)?;
///         Ok(())
///     })
///     .run()
/// ```
pub struct Application {
    title: String,
    width: f64,
    height: f64,
    config: CanvasConfig,
    font: Option<Vec<u8>>,
    font_px: f32,
    atlas_dimension: u32,
    setup: Option<SetupFn>,
    update: Option<UpdateFn>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            title: "tessel".to_string(),
            width: 1280.0,
            height: 720.0,
            config: CanvasConfig::default(),
            font: None,
            font_px: 18.0,
            atlas_dimension: 512,
            setup: None,
            update: None,
        }
    }

    /// Set the window title.
    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.title = t.into();
        self
    }

    /// Set the initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.config.clear_color = color;
        self
    }

    /// TrueType/OpenType bytes baked into a bitmap once the GPU is up.
    pub fn font(mut self, bytes: Vec<u8>) -> Self {
        self.font = Some(bytes);
        self
    }

    /// Pixel size and square atlas dimension for the font bitmap.
    pub fn font_size(mut self, pixel_size: f32, atlas_dimension: u32) -> Self {
        self.font_px = pixel_size;
        self.atlas_dimension = atlas_dimension;
        self
    }

    /// Runs once, on the first frame, after the device and font are ready.
    pub fn setup(mut self, f: impl FnOnce(&mut AppCtx<'_>) -> anyhow::Result<()> + 'static) -> Self {
        self.setup = Some(Box::new(f));
        self
    }

    /// Runs every frame after behaviours and before rendering.
    pub fn on_update(mut self, f: impl FnMut(&mut AppCtx<'_>) -> anyhow::Result<()> + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    // ── Entry points ──────────────────────────────────────────────────────

    /// Opens the window and runs the event loop until it exits.
    pub fn run(self) -> anyhow::Result<()> {
        let config = RuntimeConfig {
            title: self.title.clone(),
            initial_size: LogicalSize::new(self.width, self.height),
        };
        Runtime::run(config, GpuInit::default(), UiAppState::new(self)).context("tessel runtime failed")
    }

    /// Like [`run`](Self::run) but exits the process afterwards.
    pub fn launch(self) -> ! {
        match self.run() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                log::error!("{e:#}");
                std::process::exit(1);
            }
        }
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

// ── UiAppState ────────────────────────────────────────────────────────────

/// Resources that need a GPU, created on the first frame.
struct Live {
    dev: GraphicsDevice,
    programs: UiPrograms,
    font: Option<Font>,
}

/// Internal state that implements `tessel_engine::core::App`.
struct UiAppState {
    canvas: Canvas,
    font_bytes: Option<Vec<u8>>,
    font_px: f32,
    atlas_dimension: u32,
    setup: Option<SetupFn>,
    update: Option<UpdateFn>,
    live: Option<Live>,
}

impl UiAppState {
    fn new(app: Application) -> Self {
        Self {
            canvas: Canvas::new(app.width as f32, app.height as f32, app.config),
            font_bytes: app.font,
            font_px: app.font_px,
            atlas_dimension: app.atlas_dimension,
            setup: app.setup,
            update: app.update,
            live: None,
        }
    }

    fn start(&mut self, ctx: &mut FrameCtx<'_, '_>) -> anyhow::Result<()> {
        let mut dev = GraphicsDevice::new(ctx.gpu.create_backend());
        let programs = UiPrograms::compile(&mut dev).context("compiling UI programs")?;

        let font = match self.font_bytes.take() {
            Some(bytes) => {
                let mut font = Font::from_bytes(&bytes).context("loading font")?;
                font.generate_bitmap(&mut dev, self.font_px, self.atlas_dimension).context("baking font bitmap")?;
                Some(font)
            }
            None => None,
        };

        let (w, h) = ctx.window.logical_size();
        self.canvas.recompute_projection(w, h);

        let live = self.live.insert(Live { dev, programs, font });
        if let Some(setup) = self.setup.take() {
            let mut cx = AppCtx {
                canvas: &mut self.canvas,
                dev: &mut live.dev,
                programs: &live.programs,
                font: live.font.as_ref().and_then(|f| f.bitmap(self.font_px)),
                time: ctx.time,
            };
            setup(&mut cx).context("application setup")?;
        }
        log::info!("ui ready on {} backend", live.dev.backend_name());
        Ok(())
    }
}

impl EngineApp for UiAppState {
    fn on_resize(&mut self, _window_id: WindowId, width: f32, height: f32) {
        self.canvas.recompute_projection(width, height);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.live.is_none() {
            if let Err(e) = self.start(ctx) {
                log::error!("ui startup failed: {e:#}");
                return AppControl::Exit;
            }
        }
        let Some(Live { dev, programs, font }) = self.live.as_mut() else {
            return AppControl::Exit;
        };

        let input = UiInput::from_engine(ctx.input, ctx.input_frame, 1.0);
        if let Err(e) = self.canvas.update(&input) {
            log::warn!("behaviour update failed: {e}");
        }

        if let Some(update) = self.update.as_mut() {
            let mut cx = AppCtx {
                canvas: &mut self.canvas,
                dev: &mut *dev,
                programs: &*programs,
                font: font.as_ref().and_then(|f| f.bitmap(self.font_px)),
                time: ctx.time,
            };
            if let Err(e) = update(&mut cx) {
                log::warn!("update hook failed: {e:#}");
            }
        }

        // ── Layout + draw list ────────────────────────────────────────────
        match self.canvas.frame(dev, ctx.window.viewport()) {
            Ok(draws) => log::trace!("frame {}: {draws} draws", ctx.time.frame_index),
            Err(e) => log::error!("canvas frame failed: {e}"),
        }

        // ── Render ────────────────────────────────────────────────────────
        let clear = self.canvas.config().clear_color;
        ctx.render(clear, |rctx, target| {
            if let Err(e) = dev.encode_frame(rctx, target) {
                log::error!("encoding frame failed: {e}");
            }
        })
    }
}
