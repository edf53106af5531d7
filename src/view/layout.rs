use rustc_hash::FxHashSet;
use tracing::{trace, warn};

use crate::config::ContextConfig;
use crate::geometry::{Axis, EdgeInsets, Position, Rect, Size};
use crate::style::{
    Alignment, BoxBoundary, BoxStyle, ChildrenBoundary, InvalidFlags, Positioning, SizeValue,
    sanitize_ratio,
};
use crate::view::dpi::DpiScale;
use crate::view::invalidation::InvalidationTracker;
use crate::view::store::{ElementId, ElementStore};
use crate::view::text::{FontHandle, FontManager};

/// Outcome of one validation.
#[derive(Debug, Default)]
pub(crate) struct LayoutReport {
    /// Elements whose geometry or text layout changed, in first-change order.
    pub touched: Vec<ElementId>,
    pub size_rounds: usize,
}

/// Resolves width, height, position, absolute position and text, in that order,
/// for every element the tracker lists.
pub(crate) struct LayoutSolver<'a> {
    store: &'a mut ElementStore,
    tracker: &'a mut InvalidationTracker,
    fonts: &'a mut dyn FontManager,
    config: &'a ContextConfig,
    touched: FxHashSet<ElementId>,
    report: LayoutReport,
}

impl<'a> LayoutSolver<'a> {
    pub fn new(
        store: &'a mut ElementStore,
        tracker: &'a mut InvalidationTracker,
        fonts: &'a mut dyn FontManager,
        config: &'a ContextConfig,
    ) -> Self {
        Self {
            store,
            tracker,
            fonts,
            config,
            touched: FxHashSet::default(),
            report: LayoutReport::default(),
        }
    }

    pub fn run(mut self) -> LayoutReport {
        for axis in Axis::BOTH {
            self.size_pass(axis);
        }
        self.position_pass();
        self.absolute_pass();
        self.text_pass();
        self.tracker.compact(self.store);
        self.report
    }

    fn touch(&mut self, id: ElementId) {
        if self.touched.insert(id) {
            self.report.touched.push(id);
        }
    }

    fn scale_of(&self, id: ElementId) -> DpiScale {
        self.store
            .get(id)
            .and_then(|node| node.surface)
            .and_then(|surface| self.store.surface(surface))
            .map(|surface| DpiScale::between(surface.dpi(), self.config.base_dpi))
            .unwrap_or_default()
    }

    fn size_pass(&mut self, axis: Axis) {
        let flag = InvalidFlags::size(axis);
        let max_rounds = self.config.max_layout_passes.max(1);
        for _ in 0..max_rounds {
            let pending = self.tracker.pending(self.store, flag);
            if pending.is_empty() {
                return;
            }
            self.report.size_rounds += 1;
            for id in pending {
                self.ensure_size(id, axis);
            }
        }

        let unsettled = self.tracker.pending(self.store, flag);
        if !unsettled.is_empty() {
            warn!(
                ?axis,
                remaining = unsettled.len(),
                "layout did not settle within {max_rounds} rounds"
            );
            for id in unsettled {
                if let Some(node) = self.store.get_mut(id) {
                    node.layout.invalid.remove(flag);
                }
            }
        }
    }

    /// Resolves the size of `id` on `axis` if it is invalid, resolving what it reads first.
    fn ensure_size(&mut self, id: ElementId, axis: Axis) {
        let flag = InvalidFlags::size(axis);
        let Some(node) = self.store.get_mut(id) else {
            return;
        };
        if !node.layout.invalid.contains(flag) {
            return;
        }
        // Cleared up front so dependency cycles terminate.
        node.layout.invalid.remove(flag);

        let value = self.resolve_size(id, axis);

        let Some(node) = self.store.get_mut(id) else {
            return;
        };
        // Everything read above is already resolved.
        node.layout.invalid.remove(flag);
        if node.layout.set_size_along(axis, value) {
            trace!(?id, ?axis, value, "size resolved");
            self.touch(id);
            self.tracker.outer_size_changed(self.store, id, axis);
            self.tracker.inner_size_changed(self.store, id, axis);
        }
    }

    fn resolve_size(&mut self, id: ElementId, axis: Axis) -> f32 {
        let Some(node) = self.store.get(id) else {
            return 0.0;
        };
        let authored = node.style.size(axis);
        let (min, max) = node.style.bounds(axis);
        let scale = self.scale_of(id).along(axis);

        let value = self
            .resolve_value(id, axis, authored, scale, true)
            .unwrap_or(self.config.default_element_size);
        let min = min.0.and_then(|v| self.resolve_value(id, axis, v, scale, false));
        let max = max.0.and_then(|v| self.resolve_value(id, axis, v, scale, false));
        clamp_size(value, min, max)
    }

    /// Bounds resolve with `flex == false`, where `Default` means unbounded.
    fn resolve_value(
        &mut self,
        id: ElementId,
        axis: Axis,
        value: SizeValue,
        scale: f32,
        flex: bool,
    ) -> Option<f32> {
        match value {
            SizeValue::Pixels(v) => Some(length(v)),
            SizeValue::Points(v) => Some(length(v) * scale),
            SizeValue::Percent(p) if flex => Some(self.percent_size(id, axis, p)),
            SizeValue::Percent(p) => Some(self.parent_area(id, axis) * sanitize_ratio(p) / 100.0),
            SizeValue::AutoToChildren => Some(self.content_size(id, axis)),
            SizeValue::Default if flex => Some(self.config.default_element_size),
            SizeValue::Default => None,
        }
    }

    /// Children-area extent of the parent, or the surface extent for roots.
    fn parent_area(&mut self, id: ElementId, axis: Axis) -> f32 {
        let Some((parent, surface)) = self.store.get(id).map(|node| (node.parent, node.surface))
        else {
            return 0.0;
        };
        match parent {
            Some(parent) => {
                self.ensure_size(parent, axis);
                self.children_area(parent, axis)
            }
            None => surface
                .and_then(|surface| self.store.surface(surface))
                .map(|surface| surface.bounds().extent(axis))
                .unwrap_or(0.0),
        }
    }

    fn children_area(&self, id: ElementId, axis: Axis) -> f32 {
        let Some(node) = self.store.get(id) else {
            return 0.0;
        };
        let scale = self.scale_of(id).along(axis);
        let (lead, trail) = children_insets(&node.style, axis, scale);
        (node.layout.size_along(axis) - lead - trail).max(0.0)
    }

    fn percent_size(&mut self, id: ElementId, axis: Axis, percent: f32) -> f32 {
        let base = self.parent_area(id, axis);
        let natural = base * sanitize_ratio(percent) / 100.0;

        let Some(node) = self.store.get(id) else {
            return natural;
        };
        let (Some(parent), true) = (node.parent, node.style.is_in_flow()) else {
            return natural;
        };
        let own_margins = margin_sum(&node.style.margin, axis, 1.0);
        let Some(parent_style) = self.store.get(parent).map(|p| p.style.clone()) else {
            return natural;
        };
        if !parent_style.flexes(axis) {
            return natural;
        }
        let scale = self.scale_of(parent).along(axis);

        if axis != parent_style.child_axis {
            return natural.max(base - own_margins * scale);
        }

        let mut occupied = 0.0;
        let mut total_natural = 0.0;
        let mut percent_count = 0usize;
        let mut count = 0usize;
        for sibling in self.store.child_ids(parent) {
            let Some(style) = self.store.get(sibling).map(|s| s.style.clone()) else {
                continue;
            };
            if !style.is_in_flow() {
                continue;
            }
            count += 1;
            occupied += margin_sum(&style.margin, axis, scale);
            match style.size(axis) {
                SizeValue::Percent(p) => {
                    let natural = base * sanitize_ratio(p) / 100.0;
                    total_natural += natural;
                    occupied += natural;
                    percent_count += 1;
                }
                _ => {
                    self.ensure_size(sibling, axis);
                    occupied += self
                        .store
                        .get(sibling)
                        .map(|s| s.layout.size_along(axis))
                        .unwrap_or(0.0);
                }
            }
        }
        if count > 1 {
            occupied += length(parent_style.child_spacing) * scale * (count - 1) as f32;
        }

        let free = base - occupied;
        if free <= 0.0 || percent_count == 0 {
            return natural;
        }
        let share = if total_natural > 0.0 {
            natural / total_natural
        } else {
            1.0 / percent_count as f32
        };
        natural + free * share
    }

    /// Extent of the in-flow children (and text) plus the children insets.
    fn content_size(&mut self, id: ElementId, axis: Axis) -> f32 {
        let Some(style) = self.store.get(id).map(|node| node.style.clone()) else {
            return 0.0;
        };
        let scale = self.scale_of(id).along(axis);
        let main = axis == style.child_axis;

        let mut extent = 0.0_f32;
        let mut count = 0usize;
        for child in self.store.child_ids(id) {
            let Some((in_flow, percent, margins)) = self.store.get(child).map(|c| {
                (
                    c.style.is_in_flow(),
                    c.style.size(axis).is_percent(),
                    margin_sum(&c.style.margin, axis, scale),
                )
            }) else {
                continue;
            };
            if !in_flow || percent {
                continue;
            }
            self.ensure_size(child, axis);
            let outer = self
                .store
                .get(child)
                .map(|c| c.layout.size_along(axis))
                .unwrap_or(0.0)
                + margins;
            if main {
                extent += outer;
                count += 1;
            } else {
                extent = extent.max(outer);
            }
        }
        if main && count > 1 {
            extent += length(style.child_spacing) * scale * (count - 1) as f32;
        }

        let (lead, trail) = children_insets(&style, axis, scale);
        let mut total = extent + lead + trail;
        if style.has_text() {
            let text = self.text_extent(id, &style, axis);
            total = total.max(text + text_insets(&style, axis, scale));
        }
        total
    }

    fn text_extent(&mut self, id: ElementId, style: &BoxStyle, axis: Axis) -> f32 {
        let Some(font) = self.ensure_font(id) else {
            return 0.0;
        };
        let Some(text) = style.text.clone() else {
            return 0.0;
        };
        match axis {
            Axis::Horizontal => self.fonts.layout_text(font, &text, None).width,
            Axis::Vertical => {
                let wrap = self.wrap_width(id, style);
                self.fonts.layout_text(font, &text, wrap).height
            }
        }
    }

    /// Auto-width elements grow to their text and never wrap.
    fn wrap_width(&self, id: ElementId, style: &BoxStyle) -> Option<f32> {
        if style.width.is_auto() {
            return None;
        }
        let node = self.store.get(id)?;
        let scale = self.scale_of(id).x;
        Some((node.layout.size.width - text_insets(style, Axis::Horizontal, scale)).max(0.0))
    }

    fn ensure_font(&mut self, id: ElementId) -> Option<FontHandle> {
        let node = self.store.get(id)?;
        if let Some(font) = node.layout.font {
            return Some(font);
        }
        let request = node
            .style
            .font
            .clone()
            .unwrap_or_else(|| self.config.default_font.clone());
        let scale = self.scale_of(id).y;
        let font = self.fonts.select_font(&request, scale)?;
        self.store.get_mut(id)?.layout.font = Some(font);
        Some(font)
    }

    fn position_pass(&mut self) {
        let mut laid_out_runs = FxHashSet::default();
        for id in self.tracker.pending(self.store, InvalidFlags::POSITION) {
            let Some(node) = self.store.get(id) else {
                continue;
            };
            if !node.layout.invalid.contains(InvalidFlags::POSITION) {
                continue;
            }
            match (node.style.positioning, node.parent) {
                (Positioning::Auto, Some(parent)) => {
                    if laid_out_runs.insert(parent) {
                        self.layout_run(parent);
                    }
                }
                _ => {
                    let position = self.resolve_position(id);
                    self.apply_position(id, position);
                }
            }
        }
    }

    /// Places every Auto child of `parent` along its child axis.
    fn layout_run(&mut self, parent: ElementId) {
        let Some((style, size)) = self
            .store
            .get(parent)
            .map(|node| (node.style.clone(), node.layout.size))
        else {
            return;
        };
        let scale = self.scale_of(parent);
        let main = style.child_axis;
        let cross = main.cross();

        let area_start = |axis: Axis| children_insets(&style, axis, scale.along(axis)).0;
        let area_extent = |axis: Axis| {
            let (lead, trail) = children_insets(&style, axis, scale.along(axis));
            (size.along(axis) - lead - trail).max(0.0)
        };

        let mut items = Vec::new();
        for child in self.store.child_ids(parent) {
            let Some(node) = self.store.get(child) else {
                continue;
            };
            if node.style.positioning != Positioning::Auto {
                continue;
            }
            let margin = EdgeInsets {
                left: length(node.style.margin.left) * scale.x,
                top: length(node.style.margin.top) * scale.y,
                right: length(node.style.margin.right) * scale.x,
                bottom: length(node.style.margin.bottom) * scale.y,
            };
            items.push((child, node.style.visible, node.layout.size, margin));
        }

        let visible: Vec<_> = items.iter().filter(|item| item.1).collect();
        let spacing = length(style.child_spacing) * scale.along(main);
        let mut occupied: f32 = visible
            .iter()
            .map(|(_, _, size, margin)| size.along(main) + margin.sum(main))
            .sum();
        if visible.len() > 1 {
            occupied += spacing * (visible.len() - 1) as f32;
        }
        let (start, gap) = main_axis_start_and_gap(
            area_extent(main),
            occupied,
            spacing,
            visible.len(),
            style.alignment(main),
        );

        let mut cursor = area_start(main) + start;
        for (child, shown, child_size, margin) in items {
            let (main_pos, cross_pos) = if shown {
                let (main_lead, main_trail) = margin.pair(main);
                let (cross_lead, cross_trail) = margin.pair(cross);
                let main_pos = cursor + main_lead;
                cursor = main_pos + child_size.along(main) + main_trail + gap;
                let cross_pos = area_start(cross)
                    + cross_lead
                    + cross_item_offset(
                        area_extent(cross),
                        child_size.along(cross) + cross_lead + cross_trail,
                        style.alignment(cross),
                    );
                (main_pos, cross_pos)
            } else {
                (cursor, area_start(cross))
            };
            let position = match main {
                Axis::Horizontal => Position::new(main_pos, cross_pos),
                Axis::Vertical => Position::new(cross_pos, main_pos),
            };
            self.apply_position(child, position);
        }
    }

    fn resolve_position(&self, id: ElementId) -> Position {
        let Some(node) = self.store.get(id) else {
            return Position::default();
        };
        let style = &node.style;
        let scale = self.scale_of(id);
        match style.positioning {
            Positioning::Absolute => Position::new(
                finite(style.absolute_x) * scale.x,
                finite(style.absolute_y) * scale.y,
            ),
            Positioning::Relative => {
                let origin = self.relative_origin(id, style.relative_origin);
                let size = node.layout.size;
                let offsets = &style.relative;
                let pick = |lead: Option<f32>, trail: Option<f32>, axis: Axis| {
                    let lead = lead.filter(|v| v.is_finite());
                    let trail = trail.filter(|v| v.is_finite());
                    let start = origin.start(axis);
                    match (lead, trail) {
                        (Some(lead), _) => start + lead * scale.along(axis),
                        (None, Some(trail)) => {
                            start + origin.extent(axis) - trail * scale.along(axis) - size.along(axis)
                        }
                        (None, None) => start,
                    }
                };
                Position::new(
                    pick(offsets.left, offsets.right, Axis::Horizontal),
                    pick(offsets.top, offsets.bottom, Axis::Vertical),
                )
            }
            // Auto roots overlay each other at the surface origin.
            Positioning::Auto => Position::new(
                length(style.margin.left) * scale.x,
                length(style.margin.top) * scale.y,
            ),
        }
    }

    /// Origin rect of a Relative element, in its parent's outer-local coordinates.
    fn relative_origin(&self, id: ElementId, boundary: BoxBoundary) -> Rect {
        let Some(node) = self.store.get(id) else {
            return Rect::default();
        };
        let Some(parent) = node.parent.and_then(|p| self.store.get(p).map(|n| (p, n))) else {
            return node
                .surface
                .and_then(|surface| self.store.surface(surface))
                .map(|surface| surface.bounds())
                .unwrap_or_default();
        };
        let (parent_id, parent) = parent;
        let scale = self.scale_of(parent_id);
        boundary_rect(&parent.style, parent.layout.size, boundary, scale)
    }

    fn apply_position(&mut self, id: ElementId, position: Position) {
        let Some(node) = self.store.get_mut(id) else {
            return;
        };
        node.layout.invalid.remove(InvalidFlags::POSITION);
        if node.layout.set_relative(position) {
            trace!(?id, x = position.x, y = position.y, "position resolved");
            self.touch(id);
            self.tracker.invalidate_absolute(self.store, id);
        }
    }

    fn absolute_pass(&mut self) {
        let mut flagged = self.tracker.take_absolute();
        flagged.retain(|id| self.store.contains(*id));
        flagged.sort_by_cached_key(|id| self.store.depth(*id));

        for id in flagged {
            let Some(node) = self.store.get(id) else {
                continue;
            };
            if !node.layout.absolute_invalid {
                continue;
            }
            let origin = node
                .parent
                .and_then(|parent| self.store.get(parent))
                .map(|parent| parent.layout.absolute)
                .unwrap_or_default();

            let mut stack = vec![(id, origin)];
            while let Some((current, origin)) = stack.pop() {
                let Some(node) = self.store.get_mut(current) else {
                    continue;
                };
                node.layout.absolute_invalid = false;
                let absolute = Position::new(
                    origin.x + node.layout.relative.x,
                    origin.y + node.layout.relative.y,
                );
                // Never painted yet, e.g. just attached to a surface.
                let unpainted = node.layout.painted_rect.is_none() && node.style.visible;
                let moved = node.layout.absolute != absolute;
                node.layout.absolute = absolute;
                if moved || unpainted {
                    self.touch(current);
                }
                stack.extend(self.store.children(current).map(|child| (child, absolute)));
            }
        }
    }

    fn text_pass(&mut self) {
        for id in self.tracker.pending(self.store, InvalidFlags::TEXT) {
            let Some(node) = self.store.get_mut(id) else {
                continue;
            };
            node.layout.invalid.remove(InvalidFlags::TEXT);
            let style = node.style.clone();

            let mut layout = None;
            if let (Some(text), true) = (style.text.as_ref(), style.has_text()) {
                if let Some(font) = self.ensure_font(id) {
                    let wrap = self.wrap_width(id, &style);
                    layout = Some(self.fonts.layout_text(font, text, wrap));
                }
            }

            let Some(node) = self.store.get_mut(id) else {
                continue;
            };
            if node.layout.text != layout {
                node.layout.text = layout;
                self.touch(id);
            }
        }
    }
}

/// Box of `boundary` in the element's outer-local coordinates.
pub(crate) fn boundary_rect(
    style: &BoxStyle,
    size: Size,
    boundary: BoxBoundary,
    scale: DpiScale,
) -> Rect {
    let outer = Rect::from_size(size.width, size.height);
    let border = scaled_insets(&style.border, scale);
    match boundary {
        BoxBoundary::Outer => outer,
        BoxBoundary::InnerBorder => outer.inset(border),
        BoxBoundary::Inner => {
            let padding = scaled_insets(&style.padding, scale);
            outer.inset(border).inset(padding)
        }
    }
}

pub(crate) fn scaled_insets(insets: &EdgeInsets<f32>, scale: DpiScale) -> EdgeInsets<f32> {
    EdgeInsets {
        left: length(insets.left) * scale.x,
        top: length(insets.top) * scale.y,
        right: length(insets.right) * scale.x,
        bottom: length(insets.bottom) * scale.y,
    }
}

/// Leading and trailing inset of the children area on `axis`, in pixels.
fn children_insets(style: &BoxStyle, axis: Axis, scale: f32) -> (f32, f32) {
    let (border_lead, border_trail) = style.border.pair(axis);
    let (pad_lead, pad_trail) = style.padding.pair(axis);
    match style.children_boundary(axis) {
        ChildrenBoundary::Inner => (
            (length(border_lead) + length(pad_lead)) * scale,
            (length(border_trail) + length(pad_trail)) * scale,
        ),
        ChildrenBoundary::InnerBorder => {
            (length(border_lead) * scale, length(border_trail) * scale)
        }
    }
}

/// Text always sits in the content box.
fn text_insets(style: &BoxStyle, axis: Axis, scale: f32) -> f32 {
    (margin_sum(&style.border, axis, 1.0) + margin_sum(&style.padding, axis, 1.0)) * scale
}

fn margin_sum(insets: &EdgeInsets<f32>, axis: Axis, scale: f32) -> f32 {
    let (lead, trail) = insets.pair(axis);
    (length(lead) + length(trail)) * scale
}

/// Malformed lengths resolve to zero.
fn length(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn finite(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// `max` first, then `min`, so `min` wins when the bounds cross.
pub(crate) fn clamp_size(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let mut value = length(value);
    if let Some(max) = max {
        value = value.min(max);
    }
    if let Some(min) = min {
        value = value.max(min);
    }
    value.max(0.0)
}

fn main_axis_start_and_gap(
    main_limit: f32,
    occupied_main: f32,
    base_gap: f32,
    item_count: usize,
    alignment: Alignment,
) -> (f32, f32) {
    let free = (main_limit - occupied_main).max(0.0);
    match alignment {
        Alignment::Start => (0.0, base_gap),
        Alignment::Center => (free * 0.5, base_gap),
        Alignment::End => (free, base_gap),
        Alignment::SpaceBetween => {
            if item_count > 1 {
                (0.0, base_gap + free / ((item_count - 1) as f32))
            } else {
                (0.0, base_gap)
            }
        }
        Alignment::SpaceAround => {
            if item_count > 0 {
                let space = free / (item_count as f32);
                (space * 0.5, base_gap + space)
            } else {
                (0.0, base_gap)
            }
        }
    }
}

fn cross_item_offset(line_cross: f32, item_cross: f32, alignment: Alignment) -> f32 {
    let free = (line_cross - item_cross).max(0.0);
    match alignment {
        Alignment::Center => free * 0.5,
        Alignment::End => free,
        Alignment::Start | Alignment::SpaceBetween | Alignment::SpaceAround => 0.0,
    }
}
