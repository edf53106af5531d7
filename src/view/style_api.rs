use smol_str::SmolStr;

use crate::geometry::{Axis, Edge, EdgeInsets, Position};
use crate::style::{
    Alignment, BoxBoundary, BoxStyle, ChildrenBoundary, ClippingMode, Color, InvalidFlags,
    Positioning, RelativeOffsets, SizeBound, SizeValue,
};
use crate::view::context::GuiContext;
use crate::view::invalidation::auto_sized;
use crate::view::store::ElementId;
use crate::view::text::FontRequest;

/// What a style change can affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleEffect {
    Size(Axis),
    /// Margins and visibility: the element's place in the parent's flow.
    Flow,
    /// Padding and border.
    Insets,
    Position,
    Arrangement { boundary: bool },
    Text,
    /// Text plus font reselection.
    Font,
    Paint,
    PaintSubtree,
    None,
}

impl GuiContext {
    pub fn element_style(&self, element: ElementId) -> Option<&BoxStyle> {
        self.store.get(element).map(|node| &node.style)
    }

    fn style_value<T: Default>(&self, element: ElementId, read: impl FnOnce(&BoxStyle) -> T) -> T {
        self.element_style(element).map(read).unwrap_or_default()
    }

    /// Writes `value` into the field selected by `field`; returns `false` when unchanged.
    fn write_style<T: PartialEq>(
        &mut self,
        element: ElementId,
        field: impl FnOnce(&mut BoxStyle) -> &mut T,
        value: T,
        effect: StyleEffect,
    ) -> bool {
        let Some(node) = self.store.get_mut(element) else {
            return false;
        };
        let slot = field(&mut node.style);
        if *slot == value {
            return false;
        }
        *slot = value;
        self.apply_effect(element, effect);
        self.flush();
        true
    }

    fn apply_effect(&mut self, element: ElementId, effect: StyleEffect) {
        match effect {
            StyleEffect::Size(axis) => {
                self.tracker
                    .invalidate(&mut self.store, element, InvalidFlags::size(axis));
            }
            StyleEffect::Flow => {
                self.tracker.flow_membership_changed(&mut self.store, element);
                self.tracker.invalidate(
                    &mut self.store,
                    element,
                    InvalidFlags::SIZE | InvalidFlags::POSITION,
                );
                self.invalidate_painted_subtree(element);
            }
            StyleEffect::Insets => {
                self.tracker
                    .arrangement_changed(&mut self.store, element, true);
                for axis in Axis::BOTH {
                    self.tracker.inner_size_changed(&mut self.store, element, axis);
                }
                self.invalidate_painted_subtree(element);
            }
            StyleEffect::Position => {
                self.tracker
                    .invalidate(&mut self.store, element, InvalidFlags::POSITION);
            }
            StyleEffect::Arrangement { boundary } => {
                self.tracker
                    .arrangement_changed(&mut self.store, element, boundary);
            }
            StyleEffect::Font => {
                if let Some(node) = self.store.get_mut(element) {
                    node.layout.font = None;
                }
                self.apply_effect(element, StyleEffect::Text);
            }
            StyleEffect::Text => {
                let mut flags = InvalidFlags::TEXT;
                if let Some(style) = self.element_style(element) {
                    for axis in Axis::BOTH {
                        if auto_sized(style, axis) {
                            flags |= InvalidFlags::size(axis);
                        }
                    }
                }
                self.tracker.invalidate(&mut self.store, element, flags);
                self.invalidate_painted_subtree(element);
            }
            StyleEffect::Paint => self.invalidate_element_paint(element),
            StyleEffect::PaintSubtree => self.invalidate_painted_subtree(element),
            StyleEffect::None => {}
        }
    }

    fn invalidate_element_paint(&mut self, element: ElementId) {
        let Some(node) = self.store.get(element) else {
            return;
        };
        let rect = node.layout.outer_rect();
        if let Some(surface) = node.surface.and_then(|s| self.store.surface_mut(s)) {
            surface.invalidate_rect(rect);
        }
    }

    // ---- size ----

    pub fn set_element_width(&mut self, element: ElementId, width: SizeValue) {
        let width = width.normalized();
        self.write_style(element, |s| &mut s.width, width, StyleEffect::Size(Axis::Horizontal));
    }

    pub fn element_width(&self, element: ElementId) -> SizeValue {
        self.style_value(element, |s| s.width)
    }

    pub fn set_element_height(&mut self, element: ElementId, height: SizeValue) {
        let height = height.normalized();
        self.write_style(element, |s| &mut s.height, height, StyleEffect::Size(Axis::Vertical));
    }

    pub fn element_height(&self, element: ElementId) -> SizeValue {
        self.style_value(element, |s| s.height)
    }

    pub fn set_element_min_width(&mut self, element: ElementId, bound: impl Into<SizeBound>) {
        let bound = bound.into();
        self.write_style(element, |s| &mut s.min_width, bound, StyleEffect::Size(Axis::Horizontal));
    }

    pub fn element_min_width(&self, element: ElementId) -> SizeBound {
        self.style_value(element, |s| s.min_width)
    }

    pub fn set_element_max_width(&mut self, element: ElementId, bound: impl Into<SizeBound>) {
        let bound = bound.into();
        self.write_style(element, |s| &mut s.max_width, bound, StyleEffect::Size(Axis::Horizontal));
    }

    pub fn element_max_width(&self, element: ElementId) -> SizeBound {
        self.style_value(element, |s| s.max_width)
    }

    pub fn set_element_min_height(&mut self, element: ElementId, bound: impl Into<SizeBound>) {
        let bound = bound.into();
        self.write_style(element, |s| &mut s.min_height, bound, StyleEffect::Size(Axis::Vertical));
    }

    pub fn element_min_height(&self, element: ElementId) -> SizeBound {
        self.style_value(element, |s| s.min_height)
    }

    pub fn set_element_max_height(&mut self, element: ElementId, bound: impl Into<SizeBound>) {
        let bound = bound.into();
        self.write_style(element, |s| &mut s.max_height, bound, StyleEffect::Size(Axis::Vertical));
    }

    pub fn element_max_height(&self, element: ElementId) -> SizeBound {
        self.style_value(element, |s| s.max_height)
    }

    // ---- box edges ----

    pub fn set_element_margin(&mut self, element: ElementId, edge: Edge, value: f32) {
        let mut margin = self.style_value(element, |s| s.margin);
        margin.set(edge, value);
        self.set_element_margins(element, margin);
    }

    pub fn set_element_margins(&mut self, element: ElementId, margin: EdgeInsets<f32>) {
        self.write_style(element, |s| &mut s.margin, margin, StyleEffect::Flow);
    }

    pub fn element_margin(&self, element: ElementId) -> EdgeInsets<f32> {
        self.style_value(element, |s| s.margin)
    }

    pub fn set_element_padding(&mut self, element: ElementId, edge: Edge, value: f32) {
        let mut padding = self.style_value(element, |s| s.padding);
        padding.set(edge, value);
        self.set_element_paddings(element, padding);
    }

    pub fn set_element_paddings(&mut self, element: ElementId, padding: EdgeInsets<f32>) {
        self.write_style(element, |s| &mut s.padding, padding, StyleEffect::Insets);
    }

    pub fn element_padding(&self, element: ElementId) -> EdgeInsets<f32> {
        self.style_value(element, |s| s.padding)
    }

    pub fn set_element_border(&mut self, element: ElementId, edge: Edge, value: f32) {
        let mut border = self.style_value(element, |s| s.border);
        border.set(edge, value);
        self.set_element_borders(element, border);
    }

    pub fn set_element_borders(&mut self, element: ElementId, border: EdgeInsets<f32>) {
        self.write_style(element, |s| &mut s.border, border, StyleEffect::Insets);
    }

    pub fn element_border(&self, element: ElementId) -> EdgeInsets<f32> {
        self.style_value(element, |s| s.border)
    }

    // ---- positioning ----

    pub fn set_element_positioning(&mut self, element: ElementId, positioning: Positioning) {
        self.write_style(element, |s| &mut s.positioning, positioning, StyleEffect::Flow);
    }

    pub fn element_positioning(&self, element: ElementId) -> Positioning {
        self.style_value(element, |s| s.positioning)
    }

    /// Offset from the parent's outer origin, in points, used by `Positioning::Absolute`.
    pub fn set_element_absolute_position(&mut self, element: ElementId, x: f32, y: f32) {
        let Some(style) = self.element_style(element) else {
            return;
        };
        if style.absolute_x == x && style.absolute_y == y {
            return;
        }
        if let Some(node) = self.store.get_mut(element) {
            node.style.absolute_x = x;
            node.style.absolute_y = y;
        }
        self.apply_effect(element, StyleEffect::Position);
        self.flush();
    }

    pub fn element_authored_position(&self, element: ElementId) -> Position {
        self.style_value(element, |s| Position::new(s.absolute_x, s.absolute_y))
    }

    pub fn set_element_relative_offsets(&mut self, element: ElementId, offsets: RelativeOffsets) {
        self.write_style(element, |s| &mut s.relative, offsets, StyleEffect::Position);
    }

    pub fn set_element_relative_offset(&mut self, element: ElementId, edge: Edge, value: Option<f32>) {
        let mut offsets = self.style_value(element, |s| s.relative);
        match edge {
            Edge::Left => offsets.left = value,
            Edge::Top => offsets.top = value,
            Edge::Right => offsets.right = value,
            Edge::Bottom => offsets.bottom = value,
        }
        self.set_element_relative_offsets(element, offsets);
    }

    pub fn element_relative_offsets(&self, element: ElementId) -> RelativeOffsets {
        self.style_value(element, |s| s.relative)
    }

    pub fn set_element_relative_origin(&mut self, element: ElementId, origin: BoxBoundary) {
        self.write_style(element, |s| &mut s.relative_origin, origin, StyleEffect::Position);
    }

    pub fn element_relative_origin(&self, element: ElementId) -> BoxBoundary {
        self.style_value(element, |s| s.relative_origin)
    }

    // ---- children arrangement ----

    pub fn set_element_child_axis(&mut self, element: ElementId, axis: Axis) {
        self.write_style(
            element,
            |s| &mut s.child_axis,
            axis,
            StyleEffect::Arrangement { boundary: true },
        );
    }

    pub fn element_child_axis(&self, element: ElementId) -> Axis {
        self.style_value(element, |s| s.child_axis)
    }

    pub fn set_element_child_spacing(&mut self, element: ElementId, spacing: f32) {
        self.write_style(
            element,
            |s| &mut s.child_spacing,
            spacing,
            StyleEffect::Arrangement { boundary: true },
        );
    }

    pub fn element_child_spacing(&self, element: ElementId) -> f32 {
        self.style_value(element, |s| s.child_spacing)
    }

    pub fn set_element_horizontal_alignment(&mut self, element: ElementId, alignment: Alignment) {
        self.write_style(
            element,
            |s| &mut s.horizontal_alignment,
            alignment,
            StyleEffect::Arrangement { boundary: false },
        );
    }

    pub fn element_horizontal_alignment(&self, element: ElementId) -> Alignment {
        self.style_value(element, |s| s.horizontal_alignment)
    }

    pub fn set_element_vertical_alignment(&mut self, element: ElementId, alignment: Alignment) {
        self.write_style(
            element,
            |s| &mut s.vertical_alignment,
            alignment,
            StyleEffect::Arrangement { boundary: false },
        );
    }

    pub fn element_vertical_alignment(&self, element: ElementId) -> Alignment {
        self.style_value(element, |s| s.vertical_alignment)
    }

    pub fn set_element_children_boundary(
        &mut self,
        element: ElementId,
        axis: Axis,
        boundary: ChildrenBoundary,
    ) {
        let effect = StyleEffect::Arrangement { boundary: true };
        match axis {
            Axis::Horizontal => {
                self.write_style(element, |s| &mut s.children_width_boundary, boundary, effect)
            }
            Axis::Vertical => {
                self.write_style(element, |s| &mut s.children_height_boundary, boundary, effect)
            }
        };
    }

    pub fn element_children_boundary(&self, element: ElementId, axis: Axis) -> ChildrenBoundary {
        self.style_value(element, |s| s.children_boundary(axis))
    }

    pub fn set_element_flex_percent(&mut self, element: ElementId, axis: Axis, flex: bool) {
        let effect = StyleEffect::Arrangement { boundary: true };
        match axis {
            Axis::Horizontal => {
                self.write_style(element, |s| &mut s.flex_percent_width, flex, effect)
            }
            Axis::Vertical => self.write_style(element, |s| &mut s.flex_percent_height, flex, effect),
        };
    }

    pub fn element_flex_percent(&self, element: ElementId, axis: Axis) -> bool {
        self.style_value(element, |s| s.flexes(axis))
    }

    // ---- clipping and hit testing ----

    pub fn set_element_clipping_boundary(&mut self, element: ElementId, boundary: BoxBoundary) {
        self.write_style(
            element,
            |s| &mut s.clipping_boundary,
            boundary,
            StyleEffect::PaintSubtree,
        );
    }

    pub fn element_clipping_boundary(&self, element: ElementId) -> BoxBoundary {
        self.style_value(element, |s| s.clipping_boundary)
    }

    pub fn set_element_clipping_mode(&mut self, element: ElementId, mode: ClippingMode) {
        self.write_style(element, |s| &mut s.clipping_mode, mode, StyleEffect::PaintSubtree);
    }

    pub fn element_clipping_mode(&self, element: ElementId) -> ClippingMode {
        self.style_value(element, |s| s.clipping_mode)
    }

    pub fn set_element_visible(&mut self, element: ElementId, visible: bool) {
        self.write_style(element, |s| &mut s.visible, visible, StyleEffect::Flow);
    }

    pub fn element_visible(&self, element: ElementId) -> bool {
        self.style_value(element, |s| s.visible)
    }

    pub fn set_element_cursor_pass_through(&mut self, element: ElementId, pass_through: bool) {
        self.write_style(
            element,
            |s| &mut s.cursor_pass_through,
            pass_through,
            StyleEffect::None,
        );
    }

    pub fn element_cursor_pass_through(&self, element: ElementId) -> bool {
        self.style_value(element, |s| s.cursor_pass_through)
    }

    // ---- text ----

    pub fn set_element_text(&mut self, element: ElementId, text: Option<&str>) {
        let text = text.map(SmolStr::new);
        self.write_style(element, |s| &mut s.text, text, StyleEffect::Text);
    }

    pub fn element_text(&self, element: ElementId) -> Option<SmolStr> {
        self.style_value(element, |s| s.text.clone())
    }

    /// `None` falls back to the configured default font.
    pub fn set_element_font(&mut self, element: ElementId, font: Option<FontRequest>) {
        self.write_style(element, |s| &mut s.font, font, StyleEffect::Font);
    }

    pub fn element_font(&self, element: ElementId) -> Option<FontRequest> {
        self.style_value(element, |s| s.font.clone())
    }

    // ---- colours ----

    pub fn set_element_background_color(&mut self, element: ElementId, color: Color) {
        self.write_style(element, |s| &mut s.background_color, color, StyleEffect::Paint);
    }

    pub fn element_background_color(&self, element: ElementId) -> Color {
        self.style_value(element, |s| s.background_color)
    }

    pub fn set_element_border_color(&mut self, element: ElementId, edge: Edge, color: Color) {
        let mut colors = self.style_value(element, |s| s.border_colors);
        colors.set(edge, color);
        self.set_element_border_colors(element, colors);
    }

    pub fn set_element_border_colors(&mut self, element: ElementId, colors: EdgeInsets<Color>) {
        self.write_style(element, |s| &mut s.border_colors, colors, StyleEffect::Paint);
    }

    pub fn element_border_colors(&self, element: ElementId) -> EdgeInsets<Color> {
        self.style_value(element, |s| s.border_colors)
    }

    pub fn set_element_text_color(&mut self, element: ElementId, color: Color) {
        self.write_style(element, |s| &mut s.text_color, color, StyleEffect::Paint);
    }

    pub fn element_text_color(&self, element: ElementId) -> Color {
        self.style_value(element, |s| s.text_color)
    }
}
