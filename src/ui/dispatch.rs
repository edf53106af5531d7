use rustc_hash::FxHashSet;
use tracing::trace;

use crate::ui::event::{EventHandler, EventKind, GuiEvent, HandlerId, HandlerList};
use crate::view::context::GuiContext;
use crate::view::store::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerScope {
    Local(ElementId),
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchOutcome {
    Completed,
    /// The target element died during a callback.
    Aborted,
}

impl GuiContext {
    /// Queues `event` and delivers it unless a dispatch is already running, in which
    /// case the outermost dispatch delivers it once the current callback returns.
    pub(crate) fn post_event(&mut self, event: GuiEvent) {
        self.pending_events.push_back((event, self.event_depth));
        self.drain_events();
    }

    pub(crate) fn drain_events(&mut self) {
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        while let Some((event, depth)) = self.pending_events.pop_front() {
            self.event_depth = depth;
            self.deliver(&event);
        }
        self.event_depth = 0;
        self.dispatching = false;
    }

    /// Runs local handlers of the event's element, then global handlers.
    fn deliver(&mut self, event: &GuiEvent) {
        if let (None, Some(surface)) = (event.element, event.surface) {
            if !self.is_surface_valid(surface) {
                trace!(kind = ?event.kind, "dropping event for a deleted surface");
                return;
            }
        }
        if let Some(element) = event.element {
            if !self.store.contains(element) {
                trace!(kind = ?event.kind, "dropping event for a deleted element");
                return;
            }
            if event.kind != EventKind::SurfaceNeedsRepaint
                && self.dispatch_scope(HandlerScope::Local(element), event)
                    == DispatchOutcome::Aborted
            {
                return;
            }
        }
        self.dispatch_scope(HandlerScope::Global, event);
    }

    fn handler_list(&self, scope: HandlerScope) -> Option<&HandlerList> {
        match scope {
            HandlerScope::Local(element) => self.store.get(element).map(|node| &node.handlers),
            HandlerScope::Global => Some(&self.global_handlers),
        }
    }

    /// Walks a handler list that callbacks may edit while it is being walked.
    ///
    /// Handlers attached after the walk started are not invoked, removed ones are not
    /// invoked again, and every other handler runs exactly once.
    fn dispatch_scope(&mut self, scope: HandlerScope, event: &GuiEvent) -> DispatchOutcome {
        let newest = self.next_handler_id;
        let mut invoked: FxHashSet<HandlerId> = FxHashSet::default();
        let mut last_invoked: Option<HandlerId> = None;
        let mut cursor = 0usize;

        loop {
            if let Some(element) = event.element {
                if !self.store.contains(element) {
                    return DispatchOutcome::Aborted;
                }
            }
            let Some(list) = self.handler_list(scope) else {
                return DispatchOutcome::Aborted;
            };

            if let Some(last) = last_invoked {
                let in_place = cursor
                    .checked_sub(1)
                    .and_then(|index| list.get(index))
                    .is_some_and(|handler| handler.id() == last);
                if !in_place {
                    cursor = match list.position(last) {
                        Some(index) => index + 1,
                        None => first_pending(list, &invoked, newest),
                    };
                }
            }

            let mut next: Option<EventHandler> = None;
            while let Some(handler) = list.get(cursor) {
                if handler.id().0 < newest && !invoked.contains(&handler.id()) {
                    next = Some(handler.clone());
                    break;
                }
                cursor += 1;
            }
            let Some(handler) = next else {
                return DispatchOutcome::Completed;
            };

            invoked.insert(handler.id());
            last_invoked = Some(handler.id());
            cursor += 1;
            handler.call(self, event);
        }
    }
}

fn first_pending(list: &HandlerList, invoked: &FxHashSet<HandlerId>, newest: u64) -> usize {
    list.ids()
        .position(|id| id.0 < newest && !invoked.contains(&id))
        .unwrap_or(list.len())
}
