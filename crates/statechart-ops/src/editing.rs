//! Structural editing operations and the repair pass.
//!
//! These are the operations UI code drives in response to gestures. Placement
//! follows statechart rules: states dropped on a state land in one of its
//! regions, and a second start pseudostate opens a new region instead of
//! sharing one. Dangling or misplaced transitions are tolerated between edits
//! and fixed by [`ChartContext::make_consistent`].

use serde::Serialize;
use statechart_core::{
    Attr, AttrValue, CoreError, IdMap, Item, ItemId, ItemKind, Point, Statechart,
};
use tracing::{debug, info};

use crate::context::ChartContext;
use crate::error::ModelResult;

/// What one run of the repair pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Transitions deleted for a missing or untracked endpoint.
    pub deleted: Vec<ItemId>,
    /// Transitions moved to the statechart that scopes their endpoints.
    pub relocated: Vec<ItemId>,
    /// Empty regions removed.
    pub pruned: Vec<ItemId>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.relocated.is_empty() && self.pruned.is_empty()
    }
}

impl ChartContext {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Give `item` an id and run the initializers. The item starts detached.
    pub fn new_item(&mut self, item: impl Into<Item>) -> ItemId {
        self.doc.new_item(item)
    }

    /// Create a detached region at vertical offset `y`.
    pub fn new_statechart(&mut self, y: f64) -> ItemId {
        self.new_item(Statechart::at(y))
    }

    /// Name of a true state.
    pub fn label(&self, item: ItemId) -> Option<&str> {
        self.doc
            .item(item)
            .and_then(Item::as_state)
            .map(|s| s.name.as_str())
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// A statechart without a parent: the root, or a detached region.
    pub fn is_top_level_statechart(&self, item: ItemId) -> bool {
        self.doc.kind(item) == Some(ItemKind::Statechart) && self.doc.parent(item).is_none()
    }

    /// First region of `state` that can take `item`.
    pub fn find_child_statechart(&self, state: ItemId, item: ItemId) -> Option<ItemId> {
        self.doc
            .children(state)
            .iter()
            .copied()
            .find(|&region| self.can_add_state(item, region))
    }

    /// First region of `state` that can take `item`, appending a new region
    /// below the existing ones when none can.
    pub fn find_or_create_child_statechart(
        &mut self,
        state: ItemId,
        item: ItemId,
    ) -> ModelResult<ItemId> {
        if let Some(region) = self.find_child_statechart(state, item) {
            return Ok(region);
        }
        let y = self.layout.next_statechart_y(&self.doc, state);
        let region = self.new_statechart(y);
        let index = self.doc.children(state).len();
        self.insert(state, index, region)?;
        debug!(%state, %region, y, "created region");
        Ok(region)
    }

    /// Place `item` in `parent` (the root when `None`), moving it out of its
    /// current parent if it has one.
    ///
    /// Returns the container the item ended up in, or `None` when the drop is
    /// refused: `parent` can't hold anything (a pseudostate or transition),
    /// `parent` lies inside `item`, or `item` is a region and `parent` is not
    /// a state. A refused or failed drop leaves the document untouched.
    pub fn add_item(&mut self, item: ItemId, parent: Option<ItemId>) -> ModelResult<Option<ItemId>> {
        let root = self.doc.root();
        let target = parent.unwrap_or(root);
        let item_kind = self
            .doc
            .kind(item)
            .ok_or(CoreError::ItemNotFound { id: item })?;
        let target_kind = self
            .doc
            .kind(target)
            .ok_or(CoreError::ItemNotFound { id: target })?;
        if item == root {
            return Err(CoreError::RootImmutable { id: item }.into());
        }
        if !target_kind.is_state_or_statechart() || self.doc.is_ancestor(item, target) {
            debug!(%item, %target, "drop refused");
            return Ok(None);
        }

        let parent = match (item_kind, target_kind) {
            // Regions move between states as they are.
            (ItemKind::Statechart, ItemKind::State) => target,
            (ItemKind::Statechart, _) => {
                debug!(%item, %target, "region dropped outside a state");
                return Ok(None);
            }
            (_, ItemKind::State) => self.find_or_create_child_statechart(target, item)?,
            // The root is exempt so items can be dragged between top-level
            // regions freely.
            _ if !self.can_add_state(item, target) && !self.is_top_level_statechart(target) => {
                match self.doc.parent(target) {
                    Some(super_state) => self.find_or_create_child_statechart(super_state, item)?,
                    None => target,
                }
            }
            _ => target,
        };

        if item_kind.is_state() {
            let delta = self
                .layout
                .translation_to_parent(&self.doc, item, Some(parent));
            self.translate(item, delta)?;
        }

        if self.doc.parent(item) == Some(parent) {
            return Ok(Some(parent));
        }
        self.detach(item)?;
        let index = self.doc.children(parent).len();
        self.insert(parent, index, item)?;
        Ok(Some(parent))
    }

    /// Place several items: everything but transitions first, then
    /// transitions, so their endpoints are in place when they arrive.
    pub fn add_items(&mut self, items: &[ItemId], parent: Option<ItemId>) -> ModelResult<()> {
        let (transitions, others): (Vec<ItemId>, Vec<ItemId>) = items
            .iter()
            .partition(|&&item| self.doc.kind(item) == Some(ItemKind::Transition));
        for item in others.into_iter().chain(transitions) {
            self.add_item(item, parent)?;
        }
        Ok(())
    }

    /// Shift a positioned item by `delta`.
    pub(crate) fn translate(&mut self, item: ItemId, delta: Point) -> ModelResult<()> {
        if delta == Point::default() {
            return Ok(());
        }
        for (attr, offset) in [(Attr::X, delta.x), (Attr::Y, delta.y)] {
            if let Some(value) = self.doc.get_attr(item, attr)?.as_number() {
                self.set_attr(item, attr, AttrValue::number(value + offset))?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    fn detach(&mut self, item: ItemId) -> ModelResult<()> {
        if let Some(parent) = self.doc.parent(item) {
            if let Some(index) = self.doc.index_of(parent, item) {
                self.remove(parent, index)?;
            }
        }
        Ok(())
    }

    /// Remove `item` from its parent and the selection. Items without a
    /// parent are left alone. Transitions touching a removed state are left
    /// for the repair pass.
    pub fn delete_item(&mut self, item: ItemId) -> ModelResult<()> {
        if self.doc.parent(item).is_some() {
            self.detach(item)?;
            self.selection.remove(item);
        }
        Ok(())
    }

    pub fn delete_items(&mut self, items: &[ItemId]) -> ModelResult<()> {
        for &item in items {
            self.delete_item(item)?;
        }
        Ok(())
    }

    // =========================================================================
    // Copying
    // =========================================================================

    /// Deep-copy `items`, recording original → copy ids in `map`. Copies are
    /// detached, with positions converted to the root frame.
    pub fn copy_items(&mut self, items: &[ItemId], map: &mut IdMap) -> ModelResult<Vec<ItemId>> {
        let copies = self.doc.clone_items(items, map);
        let root = self.doc.root();
        for &item in items {
            let Some(&copy) = map.get(&item) else {
                continue;
            };
            if self.doc.kind(copy) == Some(ItemKind::Transition) {
                continue;
            }
            let delta = self.layout.translation_to_parent(&self.doc, item, Some(root));
            self.translate(copy, delta)?;
        }
        Ok(copies)
    }

    // =========================================================================
    // Repair
    // =========================================================================

    /// The statechart a transition between `src` and `dst` belongs to: the
    /// lowest common ancestor of their regions, or the nearest statechart
    /// above it when that ancestor is a state.
    fn transition_home(&self, src: ItemId, dst: ItemId) -> Option<ItemId> {
        let lca = self
            .doc
            .lowest_common_ancestor(self.doc.parent(src)?, self.doc.parent(dst)?)?;
        self.doc
            .ancestors(lca)
            .into_iter()
            .find(|&id| self.doc.kind(id) == Some(ItemKind::Statechart))
    }

    /// Delete dangling transitions, move misplaced transitions to the
    /// statechart that scopes their endpoints, and prune empty regions.
    ///
    /// Running it again right after changes nothing.
    pub fn make_consistent(&mut self) -> ModelResult<RepairReport> {
        let graph = self.index.graph_info();
        let root = self.doc.root();
        let mut report = RepairReport::default();

        for &transition in &graph.transitions {
            let src = self.doc.resolve_src(transition);
            let dst = self.doc.resolve_dst(transition);
            let home = match (src, dst) {
                (Some(src), Some(dst))
                    if graph.states_and_statecharts.contains(&src)
                        && graph.states_and_statecharts.contains(&dst) =>
                {
                    self.transition_home(src, dst)
                }
                _ => None,
            };
            let Some(home) = home else {
                debug!(%transition, ?src, ?dst, "deleting dangling transition");
                self.delete_item(transition)?;
                report.deleted.push(transition);
                continue;
            };
            if self.doc.parent(transition) != Some(home) {
                debug!(%transition, %home, "relocating transition");
                self.add_item(transition, Some(home))?;
                report.relocated.push(transition);
            }
        }

        for &item in &graph.states_and_statecharts {
            if item != root
                && self.doc.kind(item) == Some(ItemKind::Statechart)
                && self.doc.parent(item).is_some()
                && self.doc.children(item).is_empty()
            {
                debug!(region = %item, "pruning empty region");
                self.delete_item(item)?;
                report.pruned.push(item);
            }
        }

        if !report.is_empty() {
            info!(
                deleted = report.deleted.len(),
                relocated = report.relocated.len(),
                pruned = report.pruned.len(),
                "repaired statechart"
            );
        }
        Ok(report)
    }
}
