//! Arena-backed document tree.
//!
//! All items live in a single id-indexed arena. Parent/child links and
//! transition endpoints are plain [`ItemId`]s, so cloning and serialization
//! never fight ownership cycles. Mutations return the [`ChangeEvent`] they
//! produced; dispatching it to observers is the caller's job.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::event::{Attr, AttrValue, ChangeEvent};
use crate::{Item, ItemId, ItemKind, Statechart};

/// Mapping from original ids to the ids of their copies.
pub type IdMap = HashMap<ItemId, ItemId>;

/// Hook run on every newly created item.
pub type Initializer = Box<dyn Fn(ItemId, &mut Item)>;

#[derive(Debug, Clone)]
struct Node {
    item: Item,
    parent: Option<ItemId>,
}

/// The owning tree of a statechart document.
pub struct Document {
    nodes: HashMap<ItemId, Node>,
    root: ItemId,
    next_id: u64,
    initializers: Vec<Initializer>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("items", &self.nodes.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only an empty root statechart.
    pub fn new() -> Self {
        let root = ItemId(1);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                item: Item::Statechart(Statechart::default()),
                parent: None,
            },
        );
        Self {
            nodes,
            root,
            next_id: 2,
            initializers: Vec::new(),
        }
    }

    /// Build a document from loaded nodes. Used by the document format.
    /// `next_id` must be above every id in `nodes`.
    pub(crate) fn from_nodes(
        root: ItemId,
        nodes: impl IntoIterator<Item = (ItemId, Item, Option<ItemId>)>,
        next_id: u64,
    ) -> Self {
        let nodes: HashMap<ItemId, Node> = nodes
            .into_iter()
            .map(|(id, item, parent)| (id, Node { item, parent }))
            .collect();
        Self {
            nodes,
            root,
            next_id,
            initializers: Vec::new(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The root statechart.
    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.nodes.get(&id).map(|n| &n.item)
    }

    pub fn kind(&self, id: ItemId) -> Option<ItemKind> {
        self.item(id).map(Item::kind)
    }

    /// Number of items in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Ordered children of `id`; empty for leaves and unknown ids.
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.item(id).map(Item::items).unwrap_or(&[])
    }

    /// Position of `child` within `parent`'s children.
    pub fn index_of(&self, parent: ItemId, child: ItemId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// `id` followed by its ancestors, ending at the topmost one.
    pub fn ancestors(&self, id: ItemId) -> Vec<ItemId> {
        let mut path = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(item) = current {
            path.push(item);
            current = self.parent(item);
        }
        path
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: ItemId, id: ItemId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// True if `id` is reachable from the root.
    pub fn is_attached(&self, id: ItemId) -> bool {
        self.ancestors(id).last() == Some(&self.root)
    }

    /// Nearest item that is an ancestor of both `a` and `b`. Each item counts
    /// as its own ancestor.
    pub fn lowest_common_ancestor(&self, a: ItemId, b: ItemId) -> Option<ItemId> {
        let path_a = self.ancestors(a);
        let path_b = self.ancestors(b);
        path_a.into_iter().find(|item| path_b.contains(item))
    }

    /// `id` and all its descendants, in pre-order.
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(item) = stack.pop() {
            if !self.contains(item) {
                continue;
            }
            result.push(item);
            stack.extend(self.children(item).iter().rev());
        }
        result
    }

    /// Topmost ancestor of `id`: the root when attached, else the top of its
    /// detached tree.
    fn tree_top(&self, id: ItemId) -> Option<ItemId> {
        self.ancestors(id).last().copied()
    }

    /// Resolve a transition reference attribute to an existing state.
    pub fn resolve(&self, transition: ItemId, attr: Attr) -> Option<ItemId> {
        let t = self.item(transition)?.as_transition()?;
        let target = match attr {
            Attr::SrcId => t.src,
            Attr::DstId => t.dst,
            _ => None,
        }?;
        self.kind(target)
            .filter(ItemKind::is_state)
            .map(|_| target)
    }

    pub fn resolve_src(&self, transition: ItemId) -> Option<ItemId> {
        self.resolve(transition, Attr::SrcId)
    }

    pub fn resolve_dst(&self, transition: ItemId) -> Option<ItemId> {
        self.resolve(transition, Attr::DstId)
    }

    // =========================================================================
    // Item creation
    // =========================================================================

    /// Register a hook run on every item created with [`Document::new_item`].
    pub fn add_initializer(&mut self, initializer: impl Fn(ItemId, &mut Item) + 'static) {
        self.initializers.push(Box::new(initializer));
    }

    // Loaded ids are at most `ItemId::MAX`, so the counter has 2^63 ids of
    // headroom; it saturates rather than wrapping onto existing ids.
    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Assign an id to a new, detached item and run the initializers.
    pub fn new_item(&mut self, item: impl Into<Item>) -> ItemId {
        let mut item = item.into();
        let id = self.allocate_id();
        for init in &self.initializers {
            init(id, &mut item);
        }
        self.nodes.insert(id, Node { item, parent: None });
        id
    }

    /// Deep-clone `ids` with fresh ids, recording every original → copy pair
    /// in `map`. References between cloned items are remapped; references to
    /// items outside the cloned set are kept. Copies are detached.
    pub fn clone_items(&mut self, ids: &[ItemId], map: &mut IdMap) -> Vec<ItemId> {
        let mut created = Vec::new();
        let copies: Vec<ItemId> = ids
            .iter()
            .filter_map(|&id| self.clone_subtree(id, None, map, &mut created))
            .collect();

        for copy in created {
            if let Some(Node {
                item: Item::Transition(t),
                ..
            }) = self.nodes.get_mut(&copy)
            {
                if let Some(&src) = t.src.as_ref().and_then(|src| map.get(src)) {
                    t.src = Some(src);
                }
                if let Some(&dst) = t.dst.as_ref().and_then(|dst| map.get(dst)) {
                    t.dst = Some(dst);
                }
            }
        }
        copies
    }

    fn clone_subtree(
        &mut self,
        id: ItemId,
        parent: Option<ItemId>,
        map: &mut IdMap,
        created: &mut Vec<ItemId>,
    ) -> Option<ItemId> {
        let mut item = self.item(id)?.clone();
        let copy = self.allocate_id();
        map.insert(id, copy);
        created.push(copy);

        let children = item.items().to_vec();
        let copied_children: Vec<ItemId> = children
            .into_iter()
            .filter_map(|child| self.clone_subtree(child, Some(copy), map, created))
            .collect();
        if let Some(items) = item.items_mut() {
            *items = copied_children;
        }
        self.nodes.insert(copy, Node { item, parent });
        Some(copy)
    }

    /// Drop the detached trees holding `candidates` from the arena, keeping
    /// any tree that is reachable: the root's, those holding `keep`, and
    /// those holding a state that a reachable transition points at. Returns
    /// the dropped ids in ascending order.
    pub fn discard_detached(&mut self, candidates: &[ItemId], keep: &[ItemId]) -> Vec<ItemId> {
        let mut live_tops = HashSet::new();
        let mut pending: Vec<ItemId> = std::iter::once(self.root)
            .chain(keep.iter().filter_map(|&id| self.tree_top(id)))
            .collect();
        while let Some(top) = pending.pop() {
            if !live_tops.insert(top) {
                continue;
            }
            for id in self.descendants(top) {
                if let Some(t) = self.item(id).and_then(Item::as_transition) {
                    pending.extend(
                        t.src
                            .into_iter()
                            .chain(t.dst)
                            .filter_map(|target| self.tree_top(target)),
                    );
                }
            }
        }

        let dead_tops: HashSet<ItemId> = candidates
            .iter()
            .filter_map(|&id| self.tree_top(id))
            .filter(|top| !live_tops.contains(top))
            .collect();
        let mut dropped: Vec<ItemId> = dead_tops
            .into_iter()
            .flat_map(|top| self.descendants(top))
            .collect();
        dropped.sort();
        for id in &dropped {
            self.nodes.remove(id);
        }
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "discarded detached items");
        }
        dropped
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    fn check_child(&self, parent: ItemId, child: ItemId) -> CoreResult<()> {
        let parent_kind = self
            .kind(parent)
            .ok_or(CoreError::ItemNotFound { id: parent })?;
        let child_kind = self
            .kind(child)
            .ok_or(CoreError::ItemNotFound { id: child })?;
        let allowed = match parent_kind {
            ItemKind::Statechart => !child_kind.is_statechart(),
            ItemKind::State => child_kind.is_statechart(),
            ItemKind::Pseudostate(_) | ItemKind::Transition => false,
        };
        if !allowed {
            return Err(CoreError::InvalidChild {
                parent,
                parent_kind,
                child,
                child_kind,
            });
        }
        Ok(())
    }

    /// Insert the detached item `child` into `parent` at `index`.
    pub fn insert(&mut self, parent: ItemId, index: usize, child: ItemId) -> CoreResult<ChangeEvent> {
        if child == self.root {
            return Err(CoreError::RootImmutable { id: child });
        }
        self.check_child(parent, child)?;
        if let Some(current) = self.parent(child) {
            return Err(CoreError::AlreadyAttached {
                id: child,
                parent: current,
            });
        }
        if self.is_ancestor(child, parent) {
            return Err(CoreError::Cycle { id: child, parent });
        }

        let items = self
            .nodes
            .get_mut(&parent)
            .and_then(|n| n.item.items_mut())
            .ok_or(CoreError::ItemNotFound { id: parent })?;
        if index > items.len() {
            return Err(CoreError::IndexOutOfRange {
                parent,
                index,
                len: items.len(),
            });
        }
        items.insert(index, child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }

        debug!(%parent, index, item = %child, "inserted item");
        Ok(ChangeEvent::Inserted {
            parent,
            index,
            item: child,
        })
    }

    /// Insert `child` after the last child of `parent`.
    pub fn append(&mut self, parent: ItemId, child: ItemId) -> CoreResult<ChangeEvent> {
        let index = self.children(parent).len();
        self.insert(parent, index, child)
    }

    /// Remove the child at `index` of `parent`. The removed item stays in the
    /// arena, detached.
    pub fn remove(&mut self, parent: ItemId, index: usize) -> CoreResult<ChangeEvent> {
        let items = self
            .nodes
            .get_mut(&parent)
            .and_then(|n| n.item.items_mut())
            .ok_or(CoreError::ItemNotFound { id: parent })?;
        if index >= items.len() {
            return Err(CoreError::IndexOutOfRange {
                parent,
                index,
                len: items.len(),
            });
        }
        let child = items.remove(index);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }

        debug!(%parent, index, item = %child, "removed item");
        Ok(ChangeEvent::Removed {
            parent,
            index,
            item: child,
        })
    }

    /// Read an attribute.
    pub fn get_attr(&self, id: ItemId, attr: Attr) -> CoreResult<AttrValue> {
        let item = self.item(id).ok_or(CoreError::ItemNotFound { id })?;
        read_attr(item, attr).ok_or(CoreError::InvalidAttribute {
            id,
            kind: item.kind(),
            attr,
        })
    }

    /// Write an attribute, returning the change with the previous value.
    pub fn set_attr(&mut self, id: ItemId, attr: Attr, value: AttrValue) -> CoreResult<ChangeEvent> {
        let old = self.get_attr(id, attr)?;
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(CoreError::ItemNotFound { id })?;
        let kind = node.item.kind();
        if !write_attr(&mut node.item, attr, value) {
            return Err(CoreError::InvalidAttribute { id, kind, attr });
        }
        Ok(ChangeEvent::Changed { item: id, attr, old })
    }
}

fn read_attr(item: &Item, attr: Attr) -> Option<AttrValue> {
    use AttrValue::{Number, Ref, Text};

    let value = match (item, attr) {
        (Item::State(s), Attr::Name) => Text(Some(s.name.clone())),
        (Item::State(s), Attr::Entry) => Text(s.entry.clone()),
        (Item::State(s), Attr::Exit) => Text(s.exit.clone()),
        (Item::State(s), Attr::X) => Number(Some(s.x)),
        (Item::State(s), Attr::Y) => Number(Some(s.y)),
        (Item::State(s), Attr::Width) => Number(Some(s.width)),
        (Item::State(s), Attr::Height) => Number(Some(s.height)),
        (Item::Pseudostate(p), Attr::X) => Number(Some(p.x)),
        (Item::Pseudostate(p), Attr::Y) => Number(Some(p.y)),
        (Item::Statechart(s), Attr::X) => Number(Some(s.x)),
        (Item::Statechart(s), Attr::Y) => Number(Some(s.y)),
        (Item::Statechart(s), Attr::Width) => Number(Some(s.width)),
        (Item::Statechart(s), Attr::Height) => Number(Some(s.height)),
        (Item::Transition(t), Attr::Event) => Text(t.event.clone()),
        (Item::Transition(t), Attr::Guard) => Text(t.guard.clone()),
        (Item::Transition(t), Attr::Action) => Text(t.action.clone()),
        (Item::Transition(t), Attr::SrcId) => Ref(t.src),
        (Item::Transition(t), Attr::DstId) => Ref(t.dst),
        (Item::Transition(t), Attr::T1) => Number(t.t1),
        (Item::Transition(t), Attr::T2) => Number(t.t2),
        (Item::Transition(t), Attr::Pt) => Number(t.pt),
        _ => return None,
    };
    Some(value)
}

fn write_attr(item: &mut Item, attr: Attr, value: AttrValue) -> bool {
    use AttrValue::{Number, Ref, Text};

    match (item, attr, value) {
        (Item::State(s), Attr::Name, Text(v)) => s.name = v.unwrap_or_default(),
        (Item::State(s), Attr::Entry, Text(v)) => s.entry = v,
        (Item::State(s), Attr::Exit, Text(v)) => s.exit = v,
        (Item::State(s), Attr::X, Number(Some(v))) => s.x = v,
        (Item::State(s), Attr::Y, Number(Some(v))) => s.y = v,
        (Item::State(s), Attr::Width, Number(Some(v))) => s.width = v,
        (Item::State(s), Attr::Height, Number(Some(v))) => s.height = v,
        (Item::Pseudostate(p), Attr::X, Number(Some(v))) => p.x = v,
        (Item::Pseudostate(p), Attr::Y, Number(Some(v))) => p.y = v,
        (Item::Statechart(s), Attr::X, Number(Some(v))) => s.x = v,
        (Item::Statechart(s), Attr::Y, Number(Some(v))) => s.y = v,
        (Item::Statechart(s), Attr::Width, Number(Some(v))) => s.width = v,
        (Item::Statechart(s), Attr::Height, Number(Some(v))) => s.height = v,
        (Item::Transition(t), Attr::Event, Text(v)) => t.event = v,
        (Item::Transition(t), Attr::Guard, Text(v)) => t.guard = v,
        (Item::Transition(t), Attr::Action, Text(v)) => t.action = v,
        (Item::Transition(t), Attr::SrcId, Ref(v)) => t.src = v,
        (Item::Transition(t), Attr::DstId, Ref(v)) => t.dst = v,
        (Item::Transition(t), Attr::T1, Number(v)) => t.t1 = v,
        (Item::Transition(t), Attr::T2, Number(v)) => t.t2 = v,
        (Item::Transition(t), Attr::Pt, Number(v)) => t.pt = v,
        _ => return false,
    }
    true
}
