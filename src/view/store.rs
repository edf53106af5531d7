use std::ops::ControlFlow;

use slotmap::{SlotMap, new_key_type};

use crate::style::{BoxStyle, LayoutState};
use crate::ui::event::HandlerList;
use crate::view::dpi::Dpi;
use crate::view::surface::Surface;

new_key_type! {
    pub struct ElementId;
    pub struct SurfaceId;
}

#[derive(Debug)]
pub(crate) struct ElementNode {
    pub style: BoxStyle,
    pub layout: LayoutState,
    pub surface: Option<SurfaceId>,
    pub parent: Option<ElementId>,
    pub first_child: Option<ElementId>,
    pub last_child: Option<ElementId>,
    pub prev_sibling: Option<ElementId>,
    pub next_sibling: Option<ElementId>,
    pub handlers: HandlerList,
}

impl ElementNode {
    fn new() -> Self {
        Self {
            style: BoxStyle::default(),
            layout: LayoutState::new(),
            surface: None,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            handlers: HandlerList::default(),
        }
    }
}

/// Owns every element and surface. Hierarchy links are handles into the same arena.
#[derive(Debug, Default)]
pub(crate) struct ElementStore {
    elements: SlotMap<ElementId, ElementNode>,
    surfaces: SlotMap<SurfaceId, Surface>,
}

impl ElementStore {
    pub fn create_element(&mut self) -> ElementId {
        self.elements.insert(ElementNode::new())
    }

    pub fn create_surface(&mut self, width: f32, height: f32, dpi: Dpi) -> SurfaceId {
        self.surfaces.insert(Surface::new(width, height, dpi))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementNode> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut ElementNode> {
        self.elements.get_mut(id)
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id)
    }

    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.surfaces.keys().collect()
    }

    pub fn find_surface(&self, name: &str) -> Option<SurfaceId> {
        self.surfaces
            .iter()
            .find(|(_, surface)| surface.name() == Some(name))
            .map(|(id, _)| id)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn children(&self, id: ElementId) -> Children<'_> {
        Children {
            store: self,
            next: self.get(id).and_then(|node| node.first_child),
        }
    }

    pub fn child_ids(&self, id: ElementId) -> Vec<ElementId> {
        self.children(id).collect()
    }

    /// Elements after `id` under the same parent, in order.
    pub fn following_siblings(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|node| node.next_sibling);
        while let Some(sibling) = cursor {
            out.push(sibling);
            cursor = self.get(sibling).and_then(|node| node.next_sibling);
        }
        out
    }

    /// `true` when `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.get(current).and_then(|node| node.parent);
        }
        false
    }

    pub fn root_of(&self, id: ElementId) -> Option<ElementId> {
        let mut current = id;
        self.get(current)?;
        while let Some(parent) = self.get(current).and_then(|node| node.parent) {
            current = parent;
        }
        Some(current)
    }

    pub fn depth(&self, id: ElementId) -> usize {
        let mut depth = 0;
        let mut cursor = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.get(parent).and_then(|node| node.parent);
        }
        depth
    }

    /// Pre-order walk. `Break` stops the whole walk, `Continue(false)` skips the subtree.
    pub fn walk<F>(&self, id: ElementId, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(ElementId, &ElementNode) -> ControlFlow<(), bool>,
    {
        if !self.contains(id) {
            return ControlFlow::Continue(());
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            let descend = visit(current, node)?;
            if descend {
                let first = stack.len();
                stack.extend(self.children(current));
                stack[first..].reverse();
            }
        }
        ControlFlow::Continue(())
    }

    /// `id` and all its descendants in pre-order.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let _ = self.walk(id, |current, _| {
            out.push(current);
            ControlFlow::Continue(true)
        });
        out
    }

    /// Cuts `id` out of its sibling chain or its surface's root list.
    pub fn unlink(&mut self, id: ElementId) {
        let Some(node) = self.elements.get(id) else {
            return;
        };
        let (parent, prev, next, surface) =
            (node.parent, node.prev_sibling, node.next_sibling, node.surface);

        match parent {
            Some(parent) => {
                match prev {
                    Some(prev) => {
                        if let Some(prev) = self.elements.get_mut(prev) {
                            prev.next_sibling = next;
                        }
                    }
                    None => {
                        if let Some(parent) = self.elements.get_mut(parent) {
                            parent.first_child = next;
                        }
                    }
                }
                match next {
                    Some(next) => {
                        if let Some(next) = self.elements.get_mut(next) {
                            next.prev_sibling = prev;
                        }
                    }
                    None => {
                        if let Some(parent) = self.elements.get_mut(parent) {
                            parent.last_child = prev;
                        }
                    }
                }
            }
            None => {
                if let Some(surface) = surface.and_then(|s| self.surfaces.get_mut(s)) {
                    surface.roots.retain(|root| *root != id);
                }
            }
        }

        if let Some(node) = self.elements.get_mut(id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Links a detached `child` under `parent`, before `before` or at the end.
    /// The caller has already unlinked `child` and ruled out cycles.
    pub fn link(&mut self, parent: ElementId, child: ElementId, before: Option<ElementId>) {
        let before = before.filter(|sibling| {
            self.get(*sibling).and_then(|node| node.parent) == Some(parent)
        });
        let prev = match before {
            Some(sibling) => self.get(sibling).and_then(|node| node.prev_sibling),
            None => self.get(parent).and_then(|node| node.last_child),
        };

        if let Some(node) = self.elements.get_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = before;
        }
        match prev {
            Some(prev) => {
                if let Some(prev) = self.elements.get_mut(prev) {
                    prev.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(parent) = self.elements.get_mut(parent) {
                    parent.first_child = Some(child);
                }
            }
        }
        match before {
            Some(sibling) => {
                if let Some(sibling) = self.elements.get_mut(sibling) {
                    sibling.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(parent) = self.elements.get_mut(parent) {
                    parent.last_child = Some(child);
                }
            }
        }
    }

    /// Adds a parentless element to the end of a surface's root list.
    pub fn link_root(&mut self, surface: SurfaceId, root: ElementId) {
        if let Some(surface) = self.surfaces.get_mut(surface) {
            if !surface.roots.contains(&root) {
                surface.roots.push(root);
            }
        }
    }

    /// Writes `surface` into every element of the subtree; returns the touched ids.
    pub fn assign_surface(&mut self, id: ElementId, surface: Option<SurfaceId>) -> Vec<ElementId> {
        let ids = self.subtree(id);
        for current in &ids {
            if let Some(node) = self.elements.get_mut(*current) {
                node.surface = surface;
            }
        }
        ids
    }

    /// Removes `id` and its descendants; returns them in pre-order.
    pub fn remove_subtree(&mut self, id: ElementId) -> Vec<ElementId> {
        self.unlink(id);
        let ids = self.subtree(id);
        for current in &ids {
            self.elements.remove(*current);
        }
        ids
    }

    /// Removes a surface; its roots survive as detached elements.
    pub fn remove_surface(&mut self, id: SurfaceId) -> Option<(Surface, Vec<ElementId>)> {
        let surface = self.surfaces.remove(id)?;
        let mut detached = Vec::new();
        for root in &surface.roots {
            detached.extend(self.assign_surface(*root, None));
        }
        Some((surface, detached))
    }
}

/// Sibling-chain iterator over the children of one element.
pub struct Children<'a> {
    store: &'a ElementStore,
    next: Option<ElementId>,
}

impl Iterator for Children<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.store.get(current).and_then(|node| node.next_sibling);
        Some(current)
    }
}
