//! Retained-mode layout and invalidation engine.
//!
//! A [`GuiContext`] owns surfaces and a tree of elements. Style setters invalidate
//! only what they affect; the solver then resolves widths, heights, positions and
//! text for the invalid elements, marks the changed paint regions and posts
//! size/move events to handlers that may mutate the tree reentrantly.

pub mod config;
pub mod geometry;
pub mod style;
pub mod ui;
pub mod view;

pub use config::ContextConfig;
pub use geometry::{Axis, Edge, EdgeInsets, Position, Rect, Size};
pub use style::{
    Alignment, BoxBoundary, BoxStyle, ChildrenBoundary, ClippingMode, Color, InvalidFlags,
    Positioning, RelativeOffsets, SizeBound, SizeValue,
};
pub use ui::{EventKind, GuiEvent, HandlerId, MouseButton};
pub use view::{
    Children, Dpi, DpiScale, ElementId, EstimatingFontManager, FontHandle, FontManager,
    FontRequest, FontSizeType, FontSlant, GuiContext, PaintError, PaintStats, PaintTarget,
    Renderer, SurfaceId, TextLayout, TextLine, TextRun,
};
