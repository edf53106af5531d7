use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;

use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use crate::config::ContextConfig;
use crate::geometry::{Axis, Position, Rect, Size};
use crate::style::InvalidFlags;
use crate::ui::event::{EventHandler, EventKind, GuiEvent, HandlerId};
use crate::ui::input::InputState;
use crate::view::batch::BatchCounter;
use crate::view::dpi::{Dpi, DpiScale};
use crate::view::invalidation::InvalidationTracker;
use crate::view::layout::{LayoutSolver, boundary_rect, scaled_insets};
use crate::view::paint::{self, PaintError, PaintStats, Renderer};
use crate::view::store::{Children, ElementId, ElementStore, SurfaceId};
use crate::view::text::{EstimatingFontManager, FontManager, TextLayout};

/// Owns the element tree, its surfaces and the handlers, and keeps geometry valid.
///
/// Every mutation validates layout before returning unless a batch is open. Event
/// handlers receive the context mutably and may change anything, including deleting
/// the element they were invoked for.
pub struct GuiContext {
    pub(crate) config: ContextConfig,
    pub(crate) store: ElementStore,
    pub(crate) tracker: InvalidationTracker,
    pub(crate) batch: BatchCounter,
    pub(crate) fonts: Box<dyn FontManager>,
    pub(crate) renderer: Option<Box<dyn Renderer>>,
    pub(crate) global_handlers: crate::ui::event::HandlerList,
    pub(crate) next_handler_id: u64,
    pub(crate) flushing: bool,
    /// Events waiting for the running dispatch, with their flush depth.
    pub(crate) pending_events: VecDeque<(GuiEvent, usize)>,
    pub(crate) dispatching: bool,
    /// Flush depth of the event being delivered; 0 outside handlers.
    pub(crate) event_depth: usize,
    pub(crate) input: InputState,
}

impl Default for GuiContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl fmt::Debug for GuiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuiContext")
            .field("config", &self.config)
            .field("elements", &self.store.element_count())
            .field("batch_depth", &self.batch.depth())
            .field("has_renderer", &self.renderer.is_some())
            .finish()
    }
}

impl GuiContext {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            store: ElementStore::default(),
            tracker: InvalidationTracker::default(),
            batch: BatchCounter::default(),
            fonts: Box::new(EstimatingFontManager::new()),
            renderer: None,
            global_handlers: Default::default(),
            next_handler_id: 1,
            flushing: false,
            pending_events: VecDeque::new(),
            dispatching: false,
            event_depth: 0,
            input: InputState::default(),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Replaces the font manager; every resolved font and text layout is dropped.
    pub fn set_font_manager(&mut self, fonts: impl FontManager + 'static) {
        self.fonts = Box::new(fonts);
        for surface in self.store.surface_ids() {
            self.invalidate_surface_elements(surface);
        }
        self.flush();
    }

    pub fn set_renderer(&mut self, renderer: impl Renderer + 'static) {
        self.renderer = Some(Box::new(renderer));
    }

    pub fn take_renderer(&mut self) -> Option<Box<dyn Renderer>> {
        self.renderer.take()
    }

    // ---- surfaces ----

    pub fn create_surface(&mut self, width: f32, height: f32) -> SurfaceId {
        let dpi = self.config.base_dpi;
        self.create_surface_with_dpi(width, height, dpi)
    }

    pub fn create_surface_with_dpi(&mut self, width: f32, height: f32, dpi: Dpi) -> SurfaceId {
        let id = self.store.create_surface(width, height, dpi);
        debug!(?id, width, height, "surface created");
        self.flush();
        id
    }

    /// Deletes a surface. Its roots survive as detached elements.
    pub fn delete_surface(&mut self, surface: SurfaceId) -> bool {
        let Some((_, detached)) = self.store.remove_surface(surface) else {
            return false;
        };
        for id in &detached {
            self.reset_surface_state(*id);
        }
        self.input.forget_surface(surface);
        debug!(?surface, detached = detached.len(), "surface deleted");
        self.flush();
        true
    }

    pub fn is_surface_valid(&self, surface: SurfaceId) -> bool {
        self.store.surface(surface).is_some()
    }

    pub fn surfaces(&self) -> Vec<SurfaceId> {
        self.store.surface_ids()
    }

    pub fn set_surface_name(&mut self, surface: SurfaceId, name: Option<&str>) {
        if let Some(surface) = self.store.surface_mut(surface) {
            surface.name = name.map(Into::into);
        }
    }

    pub fn surface_name(&self, surface: SurfaceId) -> Option<&str> {
        self.store.surface(surface).and_then(|s| s.name())
    }

    pub fn find_surface(&self, name: &str) -> Option<SurfaceId> {
        self.store.find_surface(name)
    }

    pub fn surface_size(&self, surface: SurfaceId) -> Size {
        self.store
            .surface(surface)
            .map(|s| Size::new(s.width(), s.height()))
            .unwrap_or_default()
    }

    pub fn set_surface_size(&mut self, surface: SurfaceId, width: f32, height: f32) {
        let Some(target) = self.store.surface_mut(surface) else {
            return;
        };
        if !target.resize(width, height) {
            return;
        }
        let roots = target.roots.clone();
        for root in roots {
            self.tracker
                .invalidate(&mut self.store, root, InvalidFlags::LAYOUT | InvalidFlags::TEXT);
        }
        self.flush();
    }

    pub fn surface_dpi(&self, surface: SurfaceId) -> Dpi {
        self.store
            .surface(surface)
            .map(|s| s.dpi())
            .unwrap_or(self.config.base_dpi)
    }

    pub fn set_surface_dpi(&mut self, surface: SurfaceId, dpi: Dpi) {
        let Some(target) = self.store.surface_mut(surface) else {
            return;
        };
        if target.dpi == dpi {
            return;
        }
        target.dpi = dpi;
        debug!(?surface, x = dpi.x, y = dpi.y, "surface dpi changed");
        self.invalidate_surface_elements(surface);
        self.flush();
    }

    pub fn base_dpi(&self) -> Dpi {
        self.config.base_dpi
    }

    pub fn set_base_dpi(&mut self, dpi: Dpi) {
        if self.config.base_dpi == dpi {
            return;
        }
        self.config.base_dpi = dpi;
        debug!(x = dpi.x, y = dpi.y, "base dpi changed");
        for surface in self.store.surface_ids() {
            self.invalidate_surface_elements(surface);
        }
        self.flush();
    }

    /// Point-to-pixel scale of the surface.
    pub fn surface_scale(&self, surface: SurfaceId) -> DpiScale {
        self.store
            .surface(surface)
            .map(|s| DpiScale::between(s.dpi(), self.config.base_dpi))
            .unwrap_or_default()
    }

    pub fn surface_roots(&self, surface: SurfaceId) -> Vec<ElementId> {
        self.store
            .surface(surface)
            .map(|s| s.roots().to_vec())
            .unwrap_or_default()
    }

    pub fn surface_aux_data(&self, surface: SurfaceId) -> Option<&dyn Any> {
        self.store.surface(surface)?.aux_data.as_deref()
    }

    pub fn surface_aux_data_mut(&mut self, surface: SurfaceId) -> Option<&mut (dyn Any + 'static)> {
        self.store.surface_mut(surface)?.aux_data.as_deref_mut()
    }

    pub fn set_surface_aux_data(&mut self, surface: SurfaceId, data: Option<Box<dyn Any>>) {
        if let Some(surface) = self.store.surface_mut(surface) {
            surface.aux_data = data;
        }
    }

    pub fn invalidate_surface_rect(&mut self, surface: SurfaceId, rect: Rect) {
        let Some(target) = self.store.surface_mut(surface) else {
            return;
        };
        target.invalidate_rect(rect);
        self.flush();
    }

    pub fn invalidate_surface(&mut self, surface: SurfaceId) {
        let Some(target) = self.store.surface_mut(surface) else {
            return;
        };
        target.invalidate_all();
        self.flush();
    }

    pub fn surface_invalid_rects(&self, surface: SurfaceId) -> Vec<Rect> {
        self.store
            .surface(surface)
            .map(|s| s.invalid_rects().to_vec())
            .unwrap_or_default()
    }

    /// Paints `rect` (the whole surface when `None`) through the installed renderer.
    pub fn paint_surface(
        &mut self,
        surface: SurfaceId,
        rect: Option<Rect>,
        input: Option<&dyn Any>,
    ) -> Result<PaintStats, PaintError> {
        let mut renderer = self.renderer.take().ok_or(PaintError::NoRenderer)?;
        let result = self.paint_surface_with(surface, rect, renderer.as_mut(), input);
        self.renderer = Some(renderer);
        result
    }

    pub fn paint_surface_with(
        &mut self,
        surface: SurfaceId,
        rect: Option<Rect>,
        renderer: &mut dyn Renderer,
        input: Option<&dyn Any>,
    ) -> Result<PaintStats, PaintError> {
        if self.batch.is_open() {
            debug!(?surface, "paint deferred by an open batch");
            return Ok(PaintStats::default());
        }
        self.flush();
        paint::paint_surface(
            &mut self.store,
            surface,
            rect,
            self.config.base_dpi,
            renderer,
            input,
        )
    }

    // ---- elements ----

    pub fn create_element(&mut self) -> ElementId {
        let id = self.store.create_element();
        self.tracker
            .invalidate(&mut self.store, id, InvalidFlags::LAYOUT | InvalidFlags::TEXT);
        self.tracker.invalidate_absolute(&mut self.store, id);
        self.flush();
        id
    }

    /// Deletes the element and its whole subtree.
    pub fn delete_element(&mut self, element: ElementId) -> bool {
        if !self.store.contains(element) {
            return false;
        }
        self.tracker.flow_membership_changed(&mut self.store, element);
        self.invalidate_painted_subtree(element);
        let removed: FxHashSet<ElementId> =
            self.store.remove_subtree(element).into_iter().collect();
        self.tracker.forget(&removed);
        self.input.forget_elements(&removed);
        debug!(?element, removed = removed.len(), "element deleted");
        self.flush();
        true
    }

    pub fn is_element_valid(&self, element: ElementId) -> bool {
        self.store.contains(element)
    }

    pub fn element_count(&self) -> usize {
        self.store.element_count()
    }

    /// Appends `child` to `parent`, or detaches it with `None`.
    /// Attaching an element under its own descendant does nothing.
    pub fn set_element_parent(&mut self, child: ElementId, parent: Option<ElementId>) -> bool {
        self.attach(child, parent, None)
    }

    /// Moves `child` right before `sibling`, under the sibling's parent.
    pub fn insert_element_before(&mut self, child: ElementId, sibling: ElementId) -> bool {
        if child == sibling {
            return false;
        }
        let Some(parent) = self.store.get(sibling).and_then(|node| node.parent) else {
            return false;
        };
        self.attach(child, Some(parent), Some(sibling))
    }

    fn attach(
        &mut self,
        child: ElementId,
        parent: Option<ElementId>,
        before: Option<ElementId>,
    ) -> bool {
        let Some(node) = self.store.get(child) else {
            return false;
        };
        let (old_parent, old_surface) = (node.parent, node.surface);
        if let Some(parent) = parent {
            if !self.store.contains(parent) || self.store.is_ancestor_or_self(child, parent) {
                return false;
            }
        } else if old_parent.is_none() && old_surface.is_none() {
            return true;
        }
        let new_surface = match parent {
            Some(parent) => self.store.get(parent).and_then(|node| node.surface),
            None => None,
        };

        self.detach_effects(child);
        self.store.unlink(child);
        if let Some(parent) = parent {
            self.store.link(parent, child, before);
        }
        self.attach_effects(child, old_surface, new_surface);
        self.flush();
        true
    }

    /// Moves a root element to `surface`, or off any surface with `None`.
    /// Elements with a parent cannot change surface on their own.
    pub fn set_element_surface(&mut self, root: ElementId, surface: Option<SurfaceId>) -> bool {
        let Some(node) = self.store.get(root) else {
            return false;
        };
        if node.parent.is_some() {
            return false;
        }
        if let Some(surface) = surface {
            if !self.is_surface_valid(surface) {
                return false;
            }
        }
        let old_surface = node.surface;
        if old_surface == surface {
            return true;
        }
        self.detach_effects(root);
        self.store.unlink(root);
        if let Some(surface) = surface {
            self.store.link_root(surface, root);
        }
        self.attach_effects(root, old_surface, surface);
        self.flush();
        true
    }

    fn detach_effects(&mut self, element: ElementId) {
        self.tracker.flow_membership_changed(&mut self.store, element);
        self.invalidate_painted_subtree(element);
    }

    fn attach_effects(
        &mut self,
        element: ElementId,
        old_surface: Option<SurfaceId>,
        new_surface: Option<SurfaceId>,
    ) {
        if old_surface != new_surface {
            for id in self.store.assign_surface(element, new_surface) {
                self.reset_surface_state(id);
            }
        } else {
            self.tracker
                .invalidate(&mut self.store, element, InvalidFlags::LAYOUT | InvalidFlags::TEXT);
        }
        self.tracker.invalidate_absolute(&mut self.store, element);
        self.tracker.flow_membership_changed(&mut self.store, element);
    }

    /// The element's scale, font and paint history belong to its old surface.
    fn reset_surface_state(&mut self, id: ElementId) {
        if let Some(node) = self.store.get_mut(id) {
            node.layout.font = None;
            node.layout.painted_rect = None;
        }
        self.tracker
            .invalidate(&mut self.store, id, InvalidFlags::LAYOUT | InvalidFlags::TEXT);
        self.tracker.invalidate_absolute(&mut self.store, id);
    }

    fn invalidate_surface_elements(&mut self, surface: SurfaceId) {
        let Some(target) = self.store.surface_mut(surface) else {
            return;
        };
        target.invalidate_all();
        let roots = target.roots.clone();
        for root in roots {
            for id in self.store.subtree(root) {
                if let Some(node) = self.store.get_mut(id) {
                    node.layout.font = None;
                }
                self.tracker
                    .invalidate(&mut self.store, id, InvalidFlags::LAYOUT | InvalidFlags::TEXT);
            }
        }
    }

    pub(crate) fn invalidate_painted_subtree(&mut self, element: ElementId) {
        for id in self.store.subtree(element) {
            let Some(node) = self.store.get(id) else {
                continue;
            };
            let rects = [node.layout.painted_rect, Some(node.layout.outer_rect())];
            let Some(surface) = node.surface else {
                continue;
            };
            if let Some(surface) = self.store.surface_mut(surface) {
                for rect in rects.into_iter().flatten() {
                    surface.invalidate_rect(rect);
                }
            }
        }
    }

    // ---- tree queries ----

    pub fn element_parent(&self, element: ElementId) -> Option<ElementId> {
        self.store.get(element)?.parent
    }

    pub fn element_first_child(&self, element: ElementId) -> Option<ElementId> {
        self.store.get(element)?.first_child
    }

    pub fn element_last_child(&self, element: ElementId) -> Option<ElementId> {
        self.store.get(element)?.last_child
    }

    pub fn element_next_sibling(&self, element: ElementId) -> Option<ElementId> {
        self.store.get(element)?.next_sibling
    }

    pub fn element_previous_sibling(&self, element: ElementId) -> Option<ElementId> {
        self.store.get(element)?.prev_sibling
    }

    pub fn element_children(&self, element: ElementId) -> Children<'_> {
        self.store.children(element)
    }

    pub fn element_surface(&self, element: ElementId) -> Option<SurfaceId> {
        self.store.get(element)?.surface
    }

    /// Pre-order visit of `element` and its descendants until the visitor breaks.
    pub fn visit_subtree<F>(&self, element: ElementId, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(ElementId) -> ControlFlow<()>,
    {
        self.store.walk(element, |id, _| {
            visitor(id)?;
            ControlFlow::Continue(true)
        })
    }

    // ---- resolved geometry ----

    pub fn element_size(&self, element: ElementId) -> Size {
        self.store
            .get(element)
            .map(|node| node.layout.size)
            .unwrap_or_default()
    }

    /// Position relative to the parent's outer origin (the surface origin for roots).
    pub fn element_position(&self, element: ElementId) -> Position {
        self.store
            .get(element)
            .map(|node| node.layout.relative)
            .unwrap_or_default()
    }

    pub fn element_absolute_position(&self, element: ElementId) -> Position {
        self.store
            .get(element)
            .map(|node| node.layout.absolute)
            .unwrap_or_default()
    }

    /// Border box in surface pixels.
    pub fn element_rect(&self, element: ElementId) -> Rect {
        self.store
            .get(element)
            .map(|node| node.layout.outer_rect())
            .unwrap_or_default()
    }

    /// Content box in surface pixels.
    pub fn element_inner_rect(&self, element: ElementId) -> Rect {
        let Some(node) = self.store.get(element) else {
            return Rect::default();
        };
        let scale = self.element_scale(element);
        node.layout
            .outer_rect()
            .inset(scaled_insets(&node.style.border, scale))
            .inset(scaled_insets(&node.style.padding, scale))
    }

    /// Rect the element's children are clipped to, in surface pixels.
    pub fn element_clip_rect(&self, element: ElementId) -> Rect {
        let Some(node) = self.store.get(element) else {
            return Rect::default();
        };
        let scale = self.element_scale(element);
        let outer = node.layout.outer_rect();
        match node.style.clipping_mode {
            crate::style::ClippingMode::Auto => {
                boundary_rect(&node.style, node.layout.size, node.style.clipping_boundary, scale)
                    .translate(outer.x, outer.y)
            }
            crate::style::ClippingMode::Disabled => self
                .store
                .get(element)
                .and_then(|n| n.surface)
                .and_then(|s| self.store.surface(s))
                .map(|s| s.bounds())
                .unwrap_or(outer),
            crate::style::ClippingMode::Custom(rect) => Rect::new(
                outer.x + rect.x * scale.x,
                outer.y + rect.y * scale.y,
                rect.width * scale.x,
                rect.height * scale.y,
            ),
        }
    }

    pub fn element_text_layout(&self, element: ElementId) -> Option<&TextLayout> {
        self.store.get(element)?.layout.text.as_ref()
    }

    pub fn element_scale(&self, element: ElementId) -> DpiScale {
        self.element_surface(element)
            .map(|surface| self.surface_scale(surface))
            .unwrap_or_default()
    }

    pub fn points_to_pixels(&self, element: ElementId, axis: Axis, points: f32) -> f32 {
        self.element_scale(element).points_to_pixels(axis, points)
    }

    pub fn pixels_to_points(&self, element: ElementId, axis: Axis, pixels: f32) -> f32 {
        self.element_scale(element).pixels_to_points(axis, pixels)
    }

    // ---- handlers ----

    fn allocate_handler_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        id
    }

    pub fn add_event_handler<F>(&mut self, element: ElementId, handler: F) -> Option<HandlerId>
    where
        F: FnMut(&mut GuiContext, &GuiEvent) + 'static,
    {
        if !self.store.contains(element) {
            return None;
        }
        let id = self.allocate_handler_id();
        let node = self.store.get_mut(element)?;
        node.handlers.push(EventHandler::new(id, handler));
        Some(id)
    }

    pub fn remove_event_handler(&mut self, element: ElementId, handler: HandlerId) -> bool {
        self.store
            .get_mut(element)
            .is_some_and(|node| node.handlers.remove(handler))
    }

    pub fn add_global_event_handler<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&mut GuiContext, &GuiEvent) + 'static,
    {
        let id = self.allocate_handler_id();
        self.global_handlers.push(EventHandler::new(id, handler));
        id
    }

    pub fn remove_global_event_handler(&mut self, handler: HandlerId) -> bool {
        self.global_handlers.remove(handler)
    }

    // ---- batching and validation ----

    pub fn begin_batch(&mut self) {
        let depth = self.batch.begin();
        debug!(depth, "batch opened");
    }

    /// Closing the outermost batch validates and posts the collected events once.
    pub fn end_batch(&mut self) {
        if self.batch.end() {
            debug!("batch closed");
            self.flush();
        }
    }

    pub fn batch_depth(&self) -> u32 {
        self.batch.depth()
    }

    /// Validates now, even inside a batch. Folded into the running flush when called
    /// from an event handler.
    pub fn validate_layout(&mut self) {
        self.flush_now();
    }

    pub fn has_pending_layout(&self) -> bool {
        self.tracker.has_pending()
    }

    pub(crate) fn flush(&mut self) {
        if self.batch.is_open() {
            return;
        }
        self.flush_now();
    }

    /// Events from round `n` are `n` levels deeper than the event whose handler asked
    /// for the flush. Nothing deeper than `max_flush_rounds` is validated.
    fn flush_now(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;
        let max_rounds = self.config.max_flush_rounds.max(1);
        let base = self.event_depth;
        let mut round = 0;
        loop {
            if base + round >= max_rounds {
                if self.tracker.has_pending() {
                    warn!(
                        pending = self.tracker.len(),
                        "flush stopped after {max_rounds} rounds with layout still pending"
                    );
                }
                break;
            }
            let events = self.validate();
            if events.is_empty() {
                break;
            }
            round += 1;
            debug!(round, depth = base + round, events = events.len(), "flush round");
            self.pending_events
                .extend(events.into_iter().map(|event| (event, base + round)));
            self.drain_events();
        }
        self.flushing = false;
    }

    /// One validation: layout, paint invalidation, then the events it produced.
    fn validate(&mut self) -> Vec<GuiEvent> {
        let mut events = Vec::new();
        if self.tracker.has_pending() {
            let report =
                LayoutSolver::new(&mut self.store, &mut self.tracker, &mut *self.fonts, &self.config)
                    .run();
            trace!(
                size_rounds = report.size_rounds,
                touched = report.touched.len(),
                "layout validated"
            );
            for id in report.touched {
                if let Some(event) = self.settle_element(id) {
                    events.push(event);
                }
            }
        }

        for surface_id in self.store.surface_ids() {
            let Some(surface) = self.store.surface_mut(surface_id) else {
                continue;
            };
            if surface.needs_repaint() && !surface.repaint_requested {
                surface.repaint_requested = true;
                events.push(GuiEvent::for_surface(EventKind::SurfaceNeedsRepaint, surface_id));
            }
        }
        events
    }

    /// Invalidates old and new paint rects and builds the geometry event.
    fn settle_element(&mut self, id: ElementId) -> Option<GuiEvent> {
        let node = self.store.get_mut(id)?;
        let old = node.layout.painted_rect;
        let new = node.style.visible.then(|| node.layout.outer_rect());
        node.layout.painted_rect = new;
        let sized = std::mem::take(&mut node.layout.size_changed);
        let moved = std::mem::take(&mut node.layout.position_changed);
        let surface = node.surface;

        if let Some(target) = surface.and_then(|s| self.store.surface_mut(s)) {
            for rect in [old, new].into_iter().flatten() {
                target.invalidate_rect(rect);
            }
        }

        let kind = match (sized, moved) {
            (true, true) => EventKind::SizeAndMove,
            (true, false) => EventKind::Size,
            (false, true) => EventKind::Move,
            (false, false) => return None,
        };
        Some(GuiEvent::for_element(kind, id, surface))
    }
}
