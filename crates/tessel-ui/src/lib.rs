//! Tessel UI: a retained element tree on top of `tessel-engine`.
//!
//! Elements live in a [`UiTree`] and are addressed by [`ElementId`]. Each one
//! carries anchor/pivot/margin layout inputs that resolve lazily against its
//! parent; a [`Canvas`] owns the tree, runs [`Behavior`]s over it and draws
//! the element payloads in pre-order with nested mask scissors.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tessel_ui::prelude::*;
//!
//! Application::new()
//!     .title("hello")
//!     .setup(|cx| {
//!         let root = cx.root();
//!         let mut w = cx.widgets();
//!         let card = Panel::new(Color::from_straight(0.2, 0.2, 0.25, 1.0))
//!             .place(Placement::stretch(Edges::all(24)))
//!             .build(&mut w, root)?;
//!         Panel::new(Color::WHITE)
//!             .place(Placement::fixed(Vec2i::new(16, 16), Vec2i::new(64, 64)))
//!             .build(&mut w, card)?;
//!         Ok(())
//!     })
//!     .run()
//! ```
//!
//! # Custom behaviours
//!
//! Implement [`Behavior`] and attach it with [`UiTree::set_behavior`]; the
//! canvas calls it once per frame while its element is active.

pub mod app;
pub mod behavior;
pub mod canvas;
pub mod error;
pub mod input;
pub mod layout;
pub mod tree;
pub mod widgets;

pub use app::{AppCtx, Application};
pub use behavior::{Behavior, BehaviorCtx};
pub use canvas::{Canvas, CanvasConfig};
pub use error::UiError;
pub use input::UiInput;
pub use layout::{Edges, LayoutInputs, Resolved};
pub use tree::{Element, ElementId, RenderPayload, UiTree};

/// Everything needed to build a UI, for glob import.
pub mod prelude {
    pub use crate::app::{AppCtx, Application};
    pub use crate::behavior::{Behavior, BehaviorCtx};
    pub use crate::canvas::{Canvas, CanvasConfig};
    pub use crate::error::UiError;
    pub use crate::input::UiInput;
    pub use crate::layout::Edges;
    pub use crate::tree::{ElementId, RenderPayload, UiTree};
    pub use crate::widgets::{
        Placement, UiPrograms, WidgetCtx,
        image::Image,
        label::Label,
        mask::Mask,
        panel::Panel,
        scroll_view::{ScrollView, ScrollViewParts},
        scrollbar::{Axis, ScrollBar},
    };

    // Engine primitives everyone needs.
    pub use tessel_engine::coords::{Rect, Vec2, Vec2i};
    pub use tessel_engine::gpu::{CommandSender, GraphicsDevice, Texture};
    pub use tessel_engine::paint::Color;
    pub use tessel_engine::text::{Font, FontBitmap};
}
