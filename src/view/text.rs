use std::ops::Range;

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontSizeType {
    /// Scaled with the surface DPI.
    #[default]
    Points,
    Pixels,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontRequest {
    pub family: SmolStr,
    pub weight: u16,
    pub slant: FontSlant,
    pub size: f32,
    pub size_type: FontSizeType,
}

impl FontRequest {
    pub fn new(family: impl Into<SmolStr>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            ..Self::default()
        }
    }

    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn slant(mut self, slant: FontSlant) -> Self {
        self.slant = slant;
        self
    }

    pub fn size_type(mut self, size_type: FontSizeType) -> Self {
        self.size_type = size_type;
        self
    }

    /// Size in pixels for a vertical DPI scale of `scale`.
    pub fn pixel_size(&self, scale: f32) -> f32 {
        let size = if self.size.is_finite() { self.size.max(1.0) } else { 16.0 };
        match self.size_type {
            FontSizeType::Points => size * scale,
            FontSizeType::Pixels => size,
        }
    }
}

impl Default for FontRequest {
    fn default() -> Self {
        Self {
            family: SmolStr::new_static("sans-serif"),
            weight: 400,
            slant: FontSlant::Normal,
            size: 16.0,
            size_type: FontSizeType::Points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Byte range into the laid out text.
    pub range: Range<usize>,
    pub width: f32,
    pub top: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
    pub width: f32,
    pub height: f32,
    pub line_height: f32,
}

/// Font selection and glyph metrics, supplied by the application.
pub trait FontManager {
    fn select_font(&mut self, request: &FontRequest, scale: f32) -> Option<FontHandle>;
    fn line_height(&self, font: FontHandle) -> f32;
    fn layout_text(&mut self, font: FontHandle, text: &str, max_width: Option<f32>) -> TextLayout;
}

/// Metric estimates without real glyph data.
#[derive(Debug, Default)]
pub struct EstimatingFontManager {
    fonts: Vec<(FontRequest, f32)>,
}

impl EstimatingFontManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn pixel_size(&self, font: FontHandle) -> f32 {
        self.fonts
            .get(font.0 as usize)
            .map(|(_, size)| *size)
            .unwrap_or(16.0)
    }
}

impl FontManager for EstimatingFontManager {
    fn select_font(&mut self, request: &FontRequest, scale: f32) -> Option<FontHandle> {
        let pixel_size = request.pixel_size(scale);
        if let Some(index) = self
            .fonts
            .iter()
            .position(|(known, size)| known == request && *size == pixel_size)
        {
            return Some(FontHandle(index as u32));
        }
        self.fonts.push((request.clone(), pixel_size));
        Some(FontHandle((self.fonts.len() - 1) as u32))
    }

    fn line_height(&self, font: FontHandle) -> f32 {
        (self.pixel_size(font) * 1.25).max(1.0)
    }

    fn layout_text(&mut self, font: FontHandle, text: &str, max_width: Option<f32>) -> TextLayout {
        let font_size = self.pixel_size(font);
        let line_height = self.line_height(font);
        let max_width = max_width.filter(|w| w.is_finite() && *w > 0.0);

        let mut lines = Vec::new();
        let mut offset = 0;
        for paragraph in text.split('\n') {
            wrap_paragraph(paragraph, offset, font_size, max_width, &mut lines);
            offset += paragraph.len() + 1;
        }
        for (index, line) in lines.iter_mut().enumerate() {
            line.top = index as f32 * line_height;
        }

        TextLayout {
            width: lines.iter().map(|line| line.width).fold(0.0_f32, f32::max),
            height: lines.len() as f32 * line_height,
            lines,
            line_height,
        }
    }
}

fn estimate_char_width_px(ch: char, font_size: f32) -> f32 {
    // CJK and fullwidth glyphs are near 1em, ASCII is narrower, whitespace narrowest.
    if ch == '\t' {
        return font_size * 2.0;
    }
    if ch.is_whitespace() {
        return font_size * 0.33;
    }
    if ch.is_ascii() {
        return font_size * 0.56;
    }
    font_size
}

fn wrap_paragraph(
    paragraph: &str,
    offset: usize,
    font_size: f32,
    max_width: Option<f32>,
    out: &mut Vec<TextLine>,
) {
    let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
    let Some(max_width) = max_width else {
        let width = paragraph
            .chars()
            .map(|ch| estimate_char_width_px(ch, font_size))
            .sum();
        out.push(TextLine {
            range: offset..offset + paragraph.len(),
            width,
            top: 0.0,
        });
        return;
    };

    let mut line_start = 0;
    let mut line_width = 0.0_f32;
    // Last whitespace seen on the current line: (byte index after it, width before it).
    let mut last_break: Option<(usize, f32)> = None;

    for (index, ch) in paragraph.char_indices() {
        let advance = estimate_char_width_px(ch, font_size);
        let overflows = line_width + advance > max_width + 0.01;
        // Whitespace may hang past the edge.
        if overflows && !ch.is_whitespace() && index > line_start {
            let (end, width) = match last_break {
                Some((end, width)) if end > line_start => (end, width),
                _ => (index, line_width),
            };
            out.push(TextLine {
                range: offset + line_start..offset + end,
                width,
                top: 0.0,
            });
            line_width = paragraph[end..index]
                .chars()
                .map(|c| estimate_char_width_px(c, font_size))
                .sum();
            line_start = end;
            last_break = None;
        }
        if ch.is_whitespace() {
            last_break = Some((index + ch.len_utf8(), line_width));
        }
        line_width += advance;
    }

    out.push(TextLine {
        range: offset + line_start..offset + paragraph.len(),
        width: line_width,
        top: 0.0,
    });
}

#[cfg(feature = "cosmic-text")]
pub use cosmic::CosmicFontManager;

#[cfg(feature = "cosmic-text")]
mod cosmic {
    use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight, Wrap};

    use super::{FontHandle, FontManager, FontRequest, FontSlant, TextLayout, TextLine};

    /// Shapes text with `cosmic-text` over the system font database.
    pub struct CosmicFontManager {
        font_system: FontSystem,
        fonts: Vec<(FontRequest, f32)>,
        line_height_factor: f32,
    }

    impl CosmicFontManager {
        pub fn new() -> Self {
            Self::with_font_system(FontSystem::new())
        }

        pub fn with_font_system(font_system: FontSystem) -> Self {
            Self {
                font_system,
                fonts: Vec::new(),
                line_height_factor: 1.25,
            }
        }

        pub fn set_line_height_factor(&mut self, factor: f32) {
            self.line_height_factor = factor.max(0.8);
        }
    }

    impl Default for CosmicFontManager {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for CosmicFontManager {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("CosmicFontManager")
                .field("fonts", &self.fonts.len())
                .finish()
        }
    }

    impl FontManager for CosmicFontManager {
        fn select_font(&mut self, request: &FontRequest, scale: f32) -> Option<FontHandle> {
            let pixel_size = request.pixel_size(scale);
            if let Some(index) = self
                .fonts
                .iter()
                .position(|(known, size)| known == request && *size == pixel_size)
            {
                return Some(FontHandle(index as u32));
            }
            self.fonts.push((request.clone(), pixel_size));
            Some(FontHandle((self.fonts.len() - 1) as u32))
        }

        fn line_height(&self, font: FontHandle) -> f32 {
            let size = self
                .fonts
                .get(font.0 as usize)
                .map(|(_, size)| *size)
                .unwrap_or(16.0);
            (size * self.line_height_factor).max(1.0)
        }

        fn layout_text(
            &mut self,
            font: FontHandle,
            text: &str,
            max_width: Option<f32>,
        ) -> TextLayout {
            let Some((request, size)) = self.fonts.get(font.0 as usize).cloned() else {
                return TextLayout::default();
            };
            let line_height = self.line_height(font);

            let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(size, line_height));
            buffer.set_wrap(&mut self.font_system, Wrap::WordOrGlyph);
            buffer.set_size(
                &mut self.font_system,
                max_width.filter(|w| w.is_finite() && *w > 0.0),
                None,
            );

            let style = match request.slant {
                FontSlant::Normal => Style::Normal,
                FontSlant::Italic => Style::Italic,
                FontSlant::Oblique => Style::Oblique,
            };
            let attrs = Attrs::new()
                .family(Family::Name(request.family.as_str()))
                .weight(Weight(request.weight))
                .style(style);
            buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
            buffer.shape_until_scroll(&mut self.font_system, false);

            let mut paragraph_starts = vec![0];
            for (index, byte) in text.bytes().enumerate() {
                if byte == b'\n' {
                    paragraph_starts.push(index + 1);
                }
            }

            let mut lines = Vec::new();
            for run in buffer.layout_runs() {
                let base = paragraph_starts.get(run.line_i).copied().unwrap_or(0);
                let start = run.glyphs.first().map(|g| g.start).unwrap_or(0);
                let end = run.glyphs.last().map(|g| g.end).unwrap_or(start);
                lines.push(TextLine {
                    range: base + start..base + end,
                    width: run.line_w,
                    top: run.line_top,
                });
            }

            TextLayout {
                width: lines.iter().map(|line| line.width).fold(0.0_f32, f32::max),
                height: lines.len() as f32 * line_height,
                lines,
                line_height,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EstimatingFontManager, FontManager, FontRequest, FontSizeType};

    #[test]
    fn identical_requests_share_a_handle() {
        let mut fonts = EstimatingFontManager::new();
        let request = FontRequest::new("serif", 12.0);
        let a = fonts.select_font(&request, 1.0);
        let b = fonts.select_font(&request, 1.0);
        let c = fonts.select_font(&request, 2.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pixel_sized_fonts_ignore_scale() {
        let request = FontRequest::new("serif", 12.0).size_type(FontSizeType::Pixels);
        assert_eq!(request.pixel_size(2.0), 12.0);
        assert_eq!(FontRequest::new("serif", 12.0).pixel_size(2.0), 24.0);
    }

    #[test]
    fn wrapping_breaks_at_whitespace() {
        let mut fonts = EstimatingFontManager::new();
        let font = fonts
            .select_font(&FontRequest::new("sans", 10.0), 1.0)
            .expect("font");
        // 'a' is 5.6px wide, space 3.3px.
        let layout = fonts.layout_text(font, "aaaa aaaa", Some(30.0));
        assert_eq!(layout.lines.len(), 2);
        assert_eq!(layout.lines[0].range, 0..5);
        assert_eq!(layout.lines[1].range, 5..9);
        assert_eq!(layout.height, 2.0 * 12.5);
    }

    #[test]
    fn explicit_newlines_start_new_lines() {
        let mut fonts = EstimatingFontManager::new();
        let font = fonts
            .select_font(&FontRequest::new("sans", 10.0), 1.0)
            .expect("font");
        let layout = fonts.layout_text(font, "ab\ncd", None);
        assert_eq!(layout.lines.len(), 2);
        assert_eq!(layout.lines[1].range, 3..5);
        assert_eq!(layout.lines[1].top, 12.5);
    }
}
