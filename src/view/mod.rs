mod batch;
pub(crate) mod context;
pub mod dpi;
mod invalidation;
pub(crate) mod layout;
pub mod paint;
pub(crate) mod store;
mod style_api;
pub mod surface;
pub mod text;

pub use context::GuiContext;
pub use dpi::{Dpi, DpiScale};
pub use paint::{PaintError, PaintStats, PaintTarget, Renderer, TextRun};
pub use store::{Children, ElementId, SurfaceId};
pub use surface::Surface;
pub use text::{
    EstimatingFontManager, FontHandle, FontManager, FontRequest, FontSizeType, FontSlant,
    TextLayout, TextLine,
};

#[cfg(feature = "cosmic-text")]
pub use text::CosmicFontManager;
