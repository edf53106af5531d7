use rustc_hash::FxHashSet;

use crate::geometry::Axis;
use crate::style::{Alignment, InvalidFlags};
use crate::view::store::{ElementId, ElementStore};

/// Deduplicated list of elements with pending layout work, plus the elements whose
/// absolute position must be recomputed for their subtree.
#[derive(Debug, Default)]
pub(crate) struct InvalidationTracker {
    invalid: Vec<ElementId>,
    absolute: Vec<ElementId>,
}

impl InvalidationTracker {
    pub fn invalidate(&mut self, store: &mut ElementStore, id: ElementId, flags: InvalidFlags) {
        if flags.is_empty() {
            return;
        }
        let Some(node) = store.get_mut(id) else {
            return;
        };
        node.layout.invalid |= flags;
        if !node.layout.in_invalid_list {
            node.layout.in_invalid_list = true;
            self.invalid.push(id);
        }
    }

    pub fn invalidate_absolute(&mut self, store: &mut ElementStore, id: ElementId) {
        let Some(node) = store.get_mut(id) else {
            return;
        };
        if !node.layout.absolute_invalid {
            node.layout.absolute_invalid = true;
            self.absolute.push(id);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.invalid.is_empty() || !self.absolute.is_empty()
    }

    /// Listed elements that still carry any of `flags`, in insertion order.
    pub fn pending(&self, store: &ElementStore, flags: InvalidFlags) -> Vec<ElementId> {
        self.invalid
            .iter()
            .copied()
            .filter(|id| {
                store
                    .get(*id)
                    .is_some_and(|node| node.layout.invalid.intersects(flags))
            })
            .collect()
    }

    /// Drops entries that are dead or fully resolved.
    pub fn compact(&mut self, store: &mut ElementStore) {
        self.invalid.retain(|id| match store.get_mut(*id) {
            Some(node) if node.layout.invalid.is_empty() => {
                node.layout.in_invalid_list = false;
                false
            }
            Some(_) => true,
            None => false,
        });
    }

    pub fn take_absolute(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.absolute)
    }

    pub fn forget(&mut self, removed: &FxHashSet<ElementId>) {
        self.invalid.retain(|id| !removed.contains(id));
        self.absolute.retain(|id| !removed.contains(id));
    }

    pub fn len(&self) -> usize {
        self.invalid.len()
    }

    /// Own outer size on `axis` changed: flow siblings, an auto-sizing parent and
    /// flexing percent siblings depend on it.
    pub fn outer_size_changed(&mut self, store: &mut ElementStore, id: ElementId, axis: Axis) {
        let Some(node) = store.get(id) else {
            return;
        };
        let in_flow = node.style.is_in_flow();
        let contributes = in_flow && !node.style.size(axis).is_percent();
        let parent = node.parent;

        // Relative right/bottom anchoring and alignment depend on the own size.
        self.invalidate(store, id, InvalidFlags::POSITION);

        let Some(parent) = parent else {
            return;
        };
        if !in_flow {
            return;
        }
        let Some(parent_style) = store.get(parent).map(|p| p.style.clone()) else {
            return;
        };

        if axis == parent_style.child_axis {
            let siblings = if parent_style.alignment(axis) == Alignment::Start {
                store.following_siblings(id)
            } else {
                store.child_ids(parent)
            };
            for sibling in siblings {
                if store.get(sibling).is_some_and(|s| s.style.is_in_flow()) {
                    self.invalidate(store, sibling, InvalidFlags::POSITION);
                }
            }
        }

        if contributes && auto_sized(&parent_style, axis) {
            self.invalidate(store, parent, InvalidFlags::size(axis));
        }

        if parent_style.flexes(axis) {
            for sibling in store.child_ids(parent) {
                if sibling == id {
                    continue;
                }
                let flexing = store
                    .get(sibling)
                    .is_some_and(|s| s.style.is_in_flow() && s.style.size(axis).is_percent());
                if flexing {
                    self.invalidate(store, sibling, InvalidFlags::size(axis));
                }
            }
        }
    }

    /// The box holding the children of `id` changed on `axis`.
    pub fn inner_size_changed(&mut self, store: &mut ElementStore, id: ElementId, axis: Axis) {
        let Some(node) = store.get(id) else {
            return;
        };
        let has_text = node.style.has_text();
        let auto_height = auto_sized(&node.style, Axis::Vertical);
        if axis == Axis::Horizontal && has_text {
            let mut flags = InvalidFlags::TEXT;
            if auto_height {
                flags |= InvalidFlags::HEIGHT;
            }
            self.invalidate(store, id, flags);
        }
        for child in store.child_ids(id) {
            let Some(child_node) = store.get(child) else {
                continue;
            };
            let mut flags = InvalidFlags::POSITION;
            if depends_on_parent_size(&child_node.style, axis) {
                flags |= InvalidFlags::size(axis);
            }
            self.invalidate(store, child, flags);
        }
    }

    /// Child axis, alignment, spacing or boundary of `id` changed.
    pub fn arrangement_changed(&mut self, store: &mut ElementStore, id: ElementId, boundary: bool) {
        let Some(style) = store.get(id).map(|node| node.style.clone()) else {
            return;
        };
        let mut own = InvalidFlags::empty();
        for axis in Axis::BOTH {
            if auto_sized(&style, axis) {
                own |= InvalidFlags::size(axis);
            }
        }
        self.invalidate(store, id, own);
        for child in store.child_ids(id) {
            let mut flags = InvalidFlags::POSITION;
            if boundary {
                if let Some(child_node) = store.get(child) {
                    for axis in Axis::BOTH {
                        if depends_on_parent_size(&child_node.style, axis) {
                            flags |= InvalidFlags::size(axis);
                        }
                    }
                }
            }
            self.invalidate(store, child, flags);
        }
    }

    /// `id` is about to enter or leave its parent's flow.
    pub fn flow_membership_changed(&mut self, store: &mut ElementStore, id: ElementId) {
        let Some(node) = store.get(id) else {
            return;
        };
        let Some(parent) = node.parent else {
            return;
        };
        let Some(parent_style) = store.get(parent).map(|p| p.style.clone()) else {
            return;
        };
        let mut flags = InvalidFlags::empty();
        for axis in Axis::BOTH {
            if auto_sized(&parent_style, axis) {
                flags |= InvalidFlags::size(axis);
            }
        }
        self.invalidate(store, parent, flags);
        for sibling in store.child_ids(parent) {
            if sibling == id {
                continue;
            }
            let mut flags = InvalidFlags::empty();
            if let Some(s) = store.get(sibling) {
                if s.style.is_in_flow() {
                    flags |= InvalidFlags::POSITION;
                    for axis in Axis::BOTH {
                        if parent_style.flexes(axis) && s.style.size(axis).is_percent() {
                            flags |= InvalidFlags::size(axis);
                        }
                    }
                }
            }
            self.invalidate(store, sibling, flags);
        }
    }
}

/// Size on `axis` reads the children extent, either directly or through a bound.
pub(crate) fn auto_sized(style: &crate::style::BoxStyle, axis: Axis) -> bool {
    let (min, max) = style.bounds(axis);
    style.size(axis).is_auto()
        || min.0.is_some_and(|v| v.is_auto())
        || max.0.is_some_and(|v| v.is_auto())
}

/// Size on `axis` reads the parent's children area.
pub(crate) fn depends_on_parent_size(style: &crate::style::BoxStyle, axis: Axis) -> bool {
    let (min, max) = style.bounds(axis);
    style.size(axis).is_percent()
        || min.0.is_some_and(|v| v.is_percent())
        || max.0.is_some_and(|v| v.is_percent())
}
