use std::any::Any;

use thiserror::Error;
use tracing::debug;

use crate::geometry::{Edge, Position, Rect};
use crate::style::{ClippingMode, Color};
use crate::view::dpi::{Dpi, DpiScale};
use crate::view::layout::{boundary_rect, scaled_insets};
use crate::view::store::{ElementId, ElementStore, SurfaceId};
use crate::view::text::{FontHandle, TextLayout};

/// The surface being painted, handed to [`Renderer::begin_paint_surface`].
pub struct PaintTarget<'a> {
    pub surface: SurfaceId,
    pub width: f32,
    pub height: f32,
    pub dpi: Dpi,
    /// Region being repainted, in surface pixels.
    pub area: Rect,
    /// Slot the renderer may use for per-surface state.
    pub aux_data: &'a mut Option<Box<dyn Any>>,
}

#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub element: ElementId,
    pub text: &'a str,
    pub font: FontHandle,
    pub color: Color,
    /// Top-left of the content box in surface pixels.
    pub origin: Position,
    pub layout: &'a TextLayout,
}

pub trait Renderer {
    fn begin_paint_surface(
        &mut self,
        target: &mut PaintTarget<'_>,
        input: Option<&dyn Any>,
    ) -> Result<(), String>;
    fn end_paint_surface(&mut self) -> Result<(), String>;
    fn clear(&mut self, rect: Rect);
    fn draw_rectangle(&mut self, rect: Rect, color: Color);
    fn set_clipping_rect(&mut self, rect: Rect);
    fn can_draw_text(&self, font: FontHandle) -> bool;
    fn draw_text(&mut self, run: &TextRun<'_>);
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaintError {
    #[error("no renderer is installed")]
    NoRenderer,
    #[error("renderer failed to begin painting: {0}")]
    Begin(String),
    #[error("renderer failed to finish painting: {0}")]
    End(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PaintStats {
    pub painted: usize,
    pub skipped_subtrees: usize,
}

pub(crate) fn paint_surface(
    store: &mut ElementStore,
    surface_id: SurfaceId,
    rect: Option<Rect>,
    base_dpi: Dpi,
    renderer: &mut dyn Renderer,
    input: Option<&dyn Any>,
) -> Result<PaintStats, PaintError> {
    let Some(surface) = store.surface_mut(surface_id) else {
        return Ok(PaintStats::default());
    };
    let bounds = surface.bounds();
    let area = rect.map(|r| r.intersect(bounds)).unwrap_or(bounds);
    let scale = DpiScale::between(surface.dpi, base_dpi);
    let roots = surface.roots.clone();

    let mut target = PaintTarget {
        surface: surface_id,
        width: surface.width,
        height: surface.height,
        dpi: surface.dpi,
        area,
        aux_data: &mut surface.aux_data,
    };
    renderer
        .begin_paint_surface(&mut target, input)
        .map_err(PaintError::Begin)?;
    let mut stats = PaintStats::default();
    if !area.is_empty() {
        renderer.clear(area);
        for root in roots {
            paint_subtree(store, root, area, scale, renderer, &mut stats);
        }
    }

    renderer.end_paint_surface().map_err(PaintError::End)?;
    if let Some(surface) = store.surface_mut(surface_id) {
        surface.mark_painted(area);
    }
    debug!(
        ?surface_id,
        painted = stats.painted,
        skipped = stats.skipped_subtrees,
        "surface painted"
    );
    Ok(stats)
}

fn paint_subtree(
    store: &ElementStore,
    root: ElementId,
    clip: Rect,
    scale: DpiScale,
    renderer: &mut dyn Renderer,
    stats: &mut PaintStats,
) {
    let mut stack = vec![(root, clip)];
    while let Some((id, clip)) = stack.pop() {
        let Some(node) = store.get(id) else {
            continue;
        };
        let style = &node.style;
        if !style.visible {
            continue;
        }

        let outer = node.layout.outer_rect();
        let visible_rect = clip.intersect(outer);
        let disabled = style.clipping_mode == ClippingMode::Disabled;
        if visible_rect.is_empty() && !disabled {
            stats.skipped_subtrees += 1;
            continue;
        }

        if !visible_rect.is_empty() {
            stats.painted += 1;
            renderer.set_clipping_rect(visible_rect);
            if !style.background_color.is_transparent() {
                renderer.draw_rectangle(outer, style.background_color);
            }
            let border = scaled_insets(&style.border, scale);
            for edge in Edge::ALL {
                let color = style.border_colors.get(edge);
                let width = border.get(edge);
                if width <= 0.0 || color.is_transparent() {
                    continue;
                }
                renderer.draw_rectangle(border_edge_rect(outer, &border, edge), color);
            }
            if let (Some(text), Some(font), Some(layout)) =
                (style.text.as_deref(), node.layout.font, node.layout.text.as_ref())
            {
                if !text.is_empty() && renderer.can_draw_text(font) {
                    let content = outer.inset(border).inset(scaled_insets(&style.padding, scale));
                    renderer.draw_text(&TextRun {
                        element: id,
                        text,
                        font,
                        color: style.text_color,
                        origin: content.origin(),
                        layout,
                    });
                }
            }
        }

        let child_clip = match style.clipping_mode {
            ClippingMode::Auto => {
                let boundary = boundary_rect(style, node.layout.size, style.clipping_boundary, scale);
                clip.intersect(boundary.translate(outer.x, outer.y))
            }
            ClippingMode::Disabled => clip,
            ClippingMode::Custom(rect) => clip.intersect(Rect::new(
                outer.x + rect.x * scale.x,
                outer.y + rect.y * scale.y,
                rect.width * scale.x,
                rect.height * scale.y,
            )),
        };

        let first = stack.len();
        stack.extend(store.children(id).map(|child| (child, child_clip)));
        stack[first..].reverse();
    }
}

fn border_edge_rect(outer: Rect, border: &crate::geometry::EdgeInsets<f32>, edge: Edge) -> Rect {
    let inner_width = (outer.width - border.left - border.right).max(0.0);
    match edge {
        Edge::Left => Rect::new(outer.x, outer.y, border.left, outer.height),
        Edge::Right => Rect::new(outer.right() - border.right, outer.y, border.right, outer.height),
        Edge::Top => Rect::new(outer.x + border.left, outer.y, inner_width, border.top),
        Edge::Bottom => Rect::new(
            outer.x + border.left,
            outer.bottom() - border.bottom,
            inner_width,
            border.bottom,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::border_edge_rect;
    use crate::geometry::{Edge, EdgeInsets, Rect};

    #[test]
    fn border_edges_do_not_overlap_corners_twice() {
        let outer = Rect::new(10.0, 10.0, 100.0, 50.0);
        let border = EdgeInsets::uniform(2.0);
        assert_eq!(border_edge_rect(outer, &border, Edge::Left), Rect::new(10.0, 10.0, 2.0, 50.0));
        assert_eq!(border_edge_rect(outer, &border, Edge::Top), Rect::new(12.0, 10.0, 96.0, 2.0));
        assert_eq!(
            border_edge_rect(outer, &border, Edge::Bottom),
            Rect::new(12.0, 58.0, 96.0, 2.0)
        );
    }
}
