use crate::view::dpi::Dpi;
use crate::view::text::FontRequest;

/// Engine-wide knobs, fixed per [`GuiContext`](crate::GuiContext).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContextConfig {
    /// DPI at which one point equals one pixel.
    pub base_dpi: Dpi,
    /// Pixel size of elements whose width or height is `SizeValue::Default`.
    pub default_element_size: f32,
    /// Font used by text elements without an explicit font request.
    pub default_font: FontRequest,
    /// Upper bound on width/height worklist rounds per validation.
    pub max_layout_passes: usize,
    /// Upper bound on validate/dispatch rounds per flush.
    pub max_flush_rounds: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            base_dpi: Dpi::STANDARD,
            default_element_size: 100.0,
            default_font: FontRequest::default(),
            max_layout_passes: 16,
            max_flush_rounds: 8,
        }
    }
}

impl ContextConfig {
    pub fn with_base_dpi(mut self, dpi: Dpi) -> Self {
        self.base_dpi = dpi;
        self
    }

    pub fn with_default_element_size(mut self, size: f32) -> Self {
        self.default_element_size = if size.is_finite() { size.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_default_font(mut self, font: FontRequest) -> Self {
        self.default_font = font;
        self
    }

    pub fn with_max_layout_passes(mut self, passes: usize) -> Self {
        self.max_layout_passes = passes.max(1);
        self
    }

    pub fn with_max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds.max(1);
        self
    }
}
