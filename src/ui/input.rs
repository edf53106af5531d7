use rustc_hash::FxHashSet;

use crate::geometry::{Position, Rect};
use crate::style::ClippingMode;
use crate::ui::event::{EventKind, GuiEvent, MouseButton};
use crate::view::context::GuiContext;
use crate::view::dpi::DpiScale;
use crate::view::layout::boundary_rect;
use crate::view::store::{ElementId, ElementStore, SurfaceId};

#[derive(Debug, Clone, Default)]
pub(crate) struct InputState {
    hovered: Option<ElementId>,
    captured: Option<ElementId>,
    pointer_surface: Option<SurfaceId>,
    pointer: Option<Position>,
}

impl InputState {
    pub fn forget_elements(&mut self, removed: &FxHashSet<ElementId>) {
        if self.hovered.is_some_and(|id| removed.contains(&id)) {
            self.hovered = None;
        }
        if self.captured.is_some_and(|id| removed.contains(&id)) {
            self.captured = None;
        }
    }

    pub fn forget_surface(&mut self, surface: SurfaceId) {
        if self.pointer_surface == Some(surface) {
            self.pointer_surface = None;
            self.pointer = None;
            self.hovered = None;
        }
    }
}

impl GuiContext {
    /// Topmost visible, hit-testable element under a surface point.
    pub fn find_element_under_point(&self, surface: SurfaceId, x: f32, y: f32) -> Option<ElementId> {
        let target = self.store.surface(surface)?;
        let scale = self.surface_scale(surface);
        let clip = target.bounds();
        target
            .roots()
            .iter()
            .rev()
            .find_map(|root| hit_test(&self.store, *root, x, y, clip, scale))
    }

    pub fn hovered_element(&self) -> Option<ElementId> {
        self.input.hovered.filter(|id| self.store.contains(*id))
    }

    pub fn mouse_event_capture(&self) -> Option<ElementId> {
        self.input.captured.filter(|id| self.store.contains(*id))
    }

    /// Last pointer position and the surface it was reported on.
    pub fn pointer_position(&self) -> Option<(SurfaceId, Position)> {
        Some((self.input.pointer_surface?, self.input.pointer?))
    }

    /// Routes all mouse events to `element` until released.
    pub fn set_mouse_event_capture(&mut self, element: ElementId) -> bool {
        if !self.store.contains(element) {
            return false;
        }
        if self.mouse_event_capture() == Some(element) {
            return true;
        }
        self.release_mouse_event_capture();
        self.input.captured = Some(element);
        self.post_element_event(EventKind::SetMouseEventCapture, element);
        true
    }

    pub fn release_mouse_event_capture(&mut self) {
        if let Some(previous) = self.input.captured.take() {
            if self.store.contains(previous) {
                self.post_element_event(EventKind::ReleaseMouseEventCapture, previous);
            }
        }
    }

    pub fn on_mouse_enter(&mut self, surface: SurfaceId, x: f32, y: f32) {
        self.on_mouse_move(surface, x, y);
    }

    pub fn on_mouse_leave(&mut self, surface: SurfaceId) {
        if self.input.pointer_surface != Some(surface) {
            return;
        }
        self.input.pointer_surface = None;
        self.input.pointer = None;
        self.update_hover(None);
    }

    pub fn on_mouse_move(&mut self, surface: SurfaceId, x: f32, y: f32) {
        let Some(hit) = self.pointer_event_target(surface, x, y) else {
            return;
        };
        self.update_hover(hit);
        if let Some(target) = self.mouse_event_capture().or(hit) {
            self.post_element_event(EventKind::MouseMove { x, y }, target);
        }
    }

    pub fn on_mouse_button_pressed(&mut self, surface: SurfaceId, button: MouseButton, x: f32, y: f32) {
        self.route_mouse_event(surface, x, y, EventKind::MouseButtonPressed { button, x, y });
    }

    pub fn on_mouse_button_released(&mut self, surface: SurfaceId, button: MouseButton, x: f32, y: f32) {
        self.route_mouse_event(surface, x, y, EventKind::MouseButtonReleased { button, x, y });
    }

    pub fn on_mouse_button_double_clicked(
        &mut self,
        surface: SurfaceId,
        button: MouseButton,
        x: f32,
        y: f32,
    ) {
        self.route_mouse_event(surface, x, y, EventKind::MouseButtonDoubleClicked { button, x, y });
    }

    pub fn on_mouse_wheel(&mut self, surface: SurfaceId, delta_x: f32, delta_y: f32, x: f32, y: f32) {
        self.route_mouse_event(surface, x, y, EventKind::MouseWheel { delta_x, delta_y, x, y });
    }

    fn route_mouse_event(&mut self, surface: SurfaceId, x: f32, y: f32, kind: EventKind) {
        let Some(hit) = self.pointer_event_target(surface, x, y) else {
            return;
        };
        if let Some(target) = self.mouse_event_capture().or(hit) {
            self.post_element_event(kind, target);
        }
    }

    /// Brings layout up to date and hit tests. `None` for an unknown surface.
    fn pointer_event_target(&mut self, surface: SurfaceId, x: f32, y: f32) -> Option<Option<ElementId>> {
        if !self.is_surface_valid(surface) {
            return None;
        }
        self.flush();
        self.input.pointer_surface = Some(surface);
        self.input.pointer = Some(Position::new(x, y));
        Some(self.find_element_under_point(surface, x, y))
    }

    fn update_hover(&mut self, hit: Option<ElementId>) {
        if self.input.hovered == hit {
            return;
        }
        let previous = std::mem::replace(&mut self.input.hovered, hit);
        if let Some(previous) = previous.filter(|id| self.store.contains(*id)) {
            self.post_element_event(EventKind::MouseLeave, previous);
        }
        if let Some(hit) = hit.filter(|id| self.store.contains(*id)) {
            self.post_element_event(EventKind::MouseEnter, hit);
        }
    }

    fn post_element_event(&mut self, kind: EventKind, element: ElementId) {
        let surface = self.element_surface(element);
        self.post_event(GuiEvent::for_element(kind, element, surface));
    }
}

fn hit_test(
    store: &ElementStore,
    id: ElementId,
    x: f32,
    y: f32,
    clip: Rect,
    scale: DpiScale,
) -> Option<ElementId> {
    let node = store.get(id)?;
    if !node.style.visible || !clip.contains(x, y) {
        return None;
    }
    let outer = node.layout.outer_rect();
    let child_clip = match node.style.clipping_mode {
        ClippingMode::Auto => clip.intersect(
            boundary_rect(&node.style, node.layout.size, node.style.clipping_boundary, scale)
                .translate(outer.x, outer.y),
        ),
        ClippingMode::Disabled => clip,
        ClippingMode::Custom(rect) => clip.intersect(Rect::new(
            outer.x + rect.x * scale.x,
            outer.y + rect.y * scale.y,
            rect.width * scale.x,
            rect.height * scale.y,
        )),
    };

    let children = store.child_ids(id);
    for child in children.into_iter().rev() {
        if let Some(hit) = hit_test(store, child, x, y, child_clip, scale) {
            return Some(hit);
        }
    }

    if outer.contains(x, y) && !node.style.cursor_pass_through {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::Rect;
    use crate::style::{ClippingMode, SizeValue};
    use crate::view::context::GuiContext;

    #[test]
    fn topmost_child_wins_and_pass_through_is_transparent() {
        let mut ctx = GuiContext::default();
        let surface = ctx.create_surface(200.0, 200.0);
        let root = ctx.create_element();
        ctx.set_element_surface(root, Some(surface));
        ctx.set_element_width(root, SizeValue::px(200.0));
        ctx.set_element_height(root, SizeValue::px(200.0));
        let child = ctx.create_element();
        ctx.set_element_parent(child, Some(root));

        assert_eq!(ctx.find_element_under_point(surface, 10.0, 10.0), Some(child));
        assert_eq!(ctx.find_element_under_point(surface, 150.0, 150.0), Some(root));

        ctx.set_element_cursor_pass_through(child, true);
        assert_eq!(ctx.find_element_under_point(surface, 10.0, 10.0), Some(root));
    }

    #[test]
    fn clipped_children_are_not_hit_outside_the_clip() {
        let mut ctx = GuiContext::default();
        let surface = ctx.create_surface(400.0, 400.0);
        let root = ctx.create_element();
        ctx.set_element_surface(root, Some(surface));
        ctx.set_element_width(root, SizeValue::px(50.0));
        ctx.set_element_height(root, SizeValue::px(50.0));
        let child = ctx.create_element();
        ctx.set_element_parent(child, Some(root));
        // Default size (100px) overflows the 50px parent.
        assert_eq!(ctx.find_element_under_point(surface, 75.0, 75.0), None);

        ctx.set_element_clipping_mode(root, ClippingMode::Disabled);
        assert_eq!(ctx.find_element_under_point(surface, 75.0, 75.0), Some(child));

        ctx.set_element_clipping_mode(root, ClippingMode::Custom(Rect::new(0.0, 0.0, 20.0, 20.0)));
        assert_eq!(ctx.find_element_under_point(surface, 30.0, 30.0), Some(root));
    }

    #[test]
    fn hidden_elements_are_skipped() {
        let mut ctx = GuiContext::default();
        let surface = ctx.create_surface(200.0, 200.0);
        let root = ctx.create_element();
        ctx.set_element_surface(root, Some(surface));
        ctx.set_element_visible(root, false);
        assert_eq!(ctx.find_element_under_point(surface, 10.0, 10.0), None);
    }
}
