use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::view::context::GuiContext;
use crate::view::store::{ElementId, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    Size,
    Move,
    SizeAndMove,
    MouseEnter,
    MouseLeave,
    /// Coordinates are surface pixels.
    MouseMove { x: f32, y: f32 },
    MouseButtonPressed { button: MouseButton, x: f32, y: f32 },
    MouseButtonReleased { button: MouseButton, x: f32, y: f32 },
    MouseButtonDoubleClicked { button: MouseButton, x: f32, y: f32 },
    MouseWheel { delta_x: f32, delta_y: f32, x: f32, y: f32 },
    SetMouseEventCapture,
    ReleaseMouseEventCapture,
    /// Posted to global handlers only.
    SurfaceNeedsRepaint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuiEvent {
    pub kind: EventKind,
    pub element: Option<ElementId>,
    pub surface: Option<SurfaceId>,
}

impl GuiEvent {
    pub fn for_element(kind: EventKind, element: ElementId, surface: Option<SurfaceId>) -> Self {
        Self {
            kind,
            element: Some(element),
            surface,
        }
    }

    pub fn for_surface(kind: EventKind, surface: SurfaceId) -> Self {
        Self {
            kind,
            element: None,
            surface: Some(surface),
        }
    }
}

/// Identifies an attached handler. Ids grow monotonically per context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

type HandlerFn = dyn FnMut(&mut GuiContext, &GuiEvent);

#[derive(Clone)]
pub struct EventHandler {
    id: HandlerId,
    callback: Rc<RefCell<HandlerFn>>,
}

impl EventHandler {
    pub(crate) fn new<F>(id: HandlerId, callback: F) -> Self
    where
        F: FnMut(&mut GuiContext, &GuiEvent) + 'static,
    {
        Self {
            id,
            callback: Rc::new(RefCell::new(callback)),
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Dispatch never nests, so a handler is never running when it is called.
    pub(crate) fn call(&self, ctx: &mut GuiContext, event: &GuiEvent) {
        let mut callback = self.callback.borrow_mut();
        (&mut *callback)(ctx, event);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler").field("id", &self.id).finish()
    }
}

/// Handlers in registration order; new handlers are appended.
#[derive(Debug, Clone, Default)]
pub struct HandlerList {
    entries: Vec<EventHandler>,
}

impl HandlerList {
    pub(crate) fn push(&mut self, handler: EventHandler) {
        self.entries.push(handler);
    }

    pub(crate) fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|handler| handler.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&EventHandler> {
        self.entries.get(index)
    }

    pub(crate) fn position(&self, id: HandlerId) -> Option<usize> {
        self.entries.iter().position(|handler| handler.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.entries.iter().map(|handler| handler.id)
    }
}
