use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;

use tessel_engine::gpu::Texture;
use tessel_engine::logging::{init_logging, LoggingConfig};
use tessel_ui::prelude::*;

const ROWS: i32 = 24;
const ROW_PITCH: i32 = 36;
const CHECKER: u32 = 64;

/// Elements the per-frame hook touches.
#[derive(Copy, Clone)]
struct Scene {
    gallery: ElementId,
    spinner: ElementId,
    fps: Option<ElementId>,
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let font = load_font(std::env::args().nth(1));
    if font.is_none() {
        log::warn!("no font found; pass a .ttf path to show text");
    }

    let scene: Rc<Cell<Option<Scene>>> = Rc::new(Cell::new(None));
    let (tx, rx) = mpsc::channel::<Texture>();

    let mut app = Application::new().title("tessel demo").size(820.0, 560.0).font_size(16.0, 512);
    if let Some(bytes) = font {
        app = app.font(bytes);
    }

    let built = scene.clone();
    let setup = move |cx: &mut AppCtx<'_>| -> anyhow::Result<()> {
        let root = cx.root();
        let font = cx.font;
        let sender = cx.dev.command_sender();
        let mut w = cx.widgets();

        // ── header ────────────────────────────────────────────────────────
        let header = Panel::new(Color::from_straight(0.13, 0.13, 0.17, 1.0))
            .name("header")
            .place(Placement { size: Vec2i::new(0, 48), ..Placement::default() }.anchors(Vec2::ZERO, Vec2::new(1.0, 0.0)))
            .build(&mut w, root)?;
        let mut fps = None;
        if let Some(font) = font {
            Label::new("tessel")
                .position(Vec2i::new(16, 0))
                .align(Vec2::new(0.0, 0.5), Vec2::new(0.0, 0.5))
                .build(&mut w, font, header)?;
            let id = Label::new("0 fps")
                .name("fps")
                .color(Color::from_straight(0.6, 0.8, 0.6, 1.0))
                .position(Vec2i::new(-16, 0))
                .align(Vec2::new(1.0, 0.5), Vec2::new(1.0, 0.5))
                .build(&mut w, font, header)?;
            fps = Some(id);
        }

        // ── scrolling list ────────────────────────────────────────────────
        let list = Placement {
            position: Vec2i::new(16, 0),
            size: Vec2i::new(260, 0),
            margin: Edges { top: 64, bottom: 16, ..Edges::ZERO },
            ..Placement::default()
        }
        .anchors(Vec2::ZERO, Vec2::new(0.0, 1.0));
        let parts = ScrollView::build(
            &mut w,
            root,
            list,
            ROWS * ROW_PITCH,
            Color::from_straight(0.1, 0.1, 0.12, 1.0),
            Color::from_straight(0.45, 0.45, 0.55, 1.0),
        )?;
        for i in 0..ROWS {
            let shade = if i % 2 == 0 { 0.2 } else { 0.24 };
            let row = Panel::new(Color::from_straight(shade, shade, shade + 0.05, 1.0))
                .name(format!("row {i}"))
                .place(
                    Placement { position: Vec2i::new(0, i * ROW_PITCH), size: Vec2i::new(0, ROW_PITCH - 4), ..Placement::default() }
                        .anchors(Vec2::ZERO, Vec2::new(1.0, 0.0))
                        .margin(Edges::horizontal(4)),
                )
                .build(&mut w, parts.content)?;
            if let Some(font) = font {
                Label::new(format!("Row {}", i + 1))
                    .position(Vec2i::new(10, 0))
                    .align(Vec2::new(0.0, 0.5), Vec2::new(0.0, 0.5))
                    .build(&mut w, font, row)?;
            }
        }

        // ── gallery ───────────────────────────────────────────────────────
        let gallery = Mask::new()
            .name("gallery")
            .background(Color::from_straight(0.1, 0.1, 0.12, 1.0))
            .place(Placement::stretch(Edges { top: 64, right: 16, bottom: 16, left: 292 }))
            .build(&mut w, root)?;
        let spinner = Panel::new(Color::from_straight(0.9, 0.5, 0.2, 1.0))
            .name("spinner")
            .place(Placement::fixed(Vec2i::ZERO, Vec2i::new(40, 40)).anchors(Vec2::splat(0.5), Vec2::splat(0.5)).pivot(Vec2::splat(0.5)))
            .build(&mut w, gallery)?;

        built.set(Some(Scene { gallery, spinner, fps }));

        // The checker is generated off-thread; only the upload runs on the
        // graphics thread, at the next drain.
        thread::spawn(move || {
            let pixels = checker(CHECKER, 8);
            sender.enqueue(move |dev: &mut GraphicsDevice| {
                let texture = Texture::from_rgba(dev, CHECKER, CHECKER, &pixels)?;
                if let Err(mpsc::SendError(texture)) = tx.send(texture) {
                    texture.dispose(dev);
                }
                Ok(())
            });
        });
        Ok(())
    };

    let mut since_fps = 0.0f32;
    let update = move |cx: &mut AppCtx<'_>| -> anyhow::Result<()> {
        let Some(ids) = scene.get() else {
            return Ok(());
        };

        if let Ok(texture) = rx.try_recv() {
            log::info!("checker texture arrived");
            let image = Image::new(Rc::new(texture))
                .name("checker")
                .place(Placement::stretch(Edges::all(24)))
                .build(&mut cx.widgets(), ids.gallery)?;
            // Keep the spinner in front of the image.
            let tree = cx.canvas.tree_mut();
            tree.add_child(ids.gallery, ids.spinner)?;
            log::debug!("image {image} placed under gallery");
        }

        cx.canvas.tree_mut().set_rotation(ids.spinner, cx.time.elapsed * 90.0)?;

        since_fps += cx.time.dt;
        if let (Some(fps), Some(font)) = (ids.fps, cx.font) {
            if since_fps >= 0.5 && cx.time.dt > 0.0 {
                since_fps = 0.0;
                let text = format!("{:.0} fps", 1.0 / cx.time.dt);
                Label::set_text(cx.canvas.tree_mut(), cx.dev, font, fps, &text)?;
            }
        }
        Ok(())
    };

    app.setup(setup).on_update(update).run()
}

/// `size²` straight RGBA checkerboard with `cells` squares per side.
fn checker(size: u32, cells: u32) -> Vec<u8> {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let v = if (x / cell + y / cell) % 2 == 0 { 230 } else { 60 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

/// Reads the font at `path`, or the first common system font found.
fn load_font(path: Option<String>) -> Option<Vec<u8>> {
    if let Some(path) = path {
        match std::fs::read(&path) {
            Ok(bytes) => return Some(bytes),
            Err(e) => log::warn!("cannot read font {path}: {e}"),
        }
    }
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
}
