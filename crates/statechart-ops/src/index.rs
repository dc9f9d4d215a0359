//! Live graph index over a statechart document.
//!
//! Tracks every state, statechart and transition reachable from the root and,
//! for each state, its incoming and outgoing transitions. The index is a
//! derived cache: it is updated from [`ChangeEvent`]s as they happen and never
//! decides whether an item exists; the [`Document`] does.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use statechart_core::{ChangeEvent, ChangeObserver, Document, ItemId, ItemKind};
use tracing::trace;

use crate::error::{ModelError, ModelResult};

/// Incident transitions of one state, in registration order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Adjacency {
    incoming: Vec<ItemId>,
    outgoing: Vec<ItemId>,
}

impl Adjacency {
    fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

/// States, statecharts and transitions of a (sub)graph, with transitions
/// classified relative to it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GraphInfo {
    pub states_and_statecharts: BTreeSet<ItemId>,
    /// All transitions touching a state of the graph.
    pub transitions: BTreeSet<ItemId>,
    /// Both endpoints inside.
    pub interior_transitions: BTreeSet<ItemId>,
    /// Destination inside, source outside.
    pub in_transitions: BTreeSet<ItemId>,
    /// Source inside, destination outside.
    pub out_transitions: BTreeSet<ItemId>,
}

/// Incrementally maintained adjacency index.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    root: ItemId,
    states: BTreeSet<ItemId>,
    statecharts: BTreeSet<ItemId>,
    transitions: BTreeSet<ItemId>,
    // Keyed by endpoint. An entry outlives its state's removal while tracked
    // transitions still reference it, so reinserting the state restores them.
    adjacency: HashMap<ItemId, Adjacency>,
    // Endpoints each tracked transition was registered under.
    endpoints: HashMap<ItemId, (Option<ItemId>, Option<ItemId>)>,
}

impl GraphIndex {
    /// Index everything reachable from the document root.
    pub fn new(doc: &Document) -> Self {
        let mut index = Self {
            root: doc.root(),
            states: BTreeSet::new(),
            statecharts: BTreeSet::new(),
            transitions: BTreeSet::new(),
            adjacency: HashMap::new(),
            endpoints: HashMap::new(),
        };
        index.insert_item(doc, doc.root());
        index
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `id` is a state or statechart currently in the tree.
    pub fn is_tracked(&self, id: ItemId) -> bool {
        self.states.contains(&id) || self.statecharts.contains(&id)
    }

    pub fn is_tracked_state(&self, id: ItemId) -> bool {
        self.states.contains(&id)
    }

    pub fn is_tracked_transition(&self, id: ItemId) -> bool {
        self.transitions.contains(&id)
    }

    pub fn states(&self) -> &BTreeSet<ItemId> {
        &self.states
    }

    pub fn statecharts(&self) -> &BTreeSet<ItemId> {
        &self.statecharts
    }

    pub fn transitions(&self) -> &BTreeSet<ItemId> {
        &self.transitions
    }

    /// Source and destination a tracked transition is registered under.
    pub fn endpoints(&self, transition: ItemId) -> (Option<ItemId>, Option<ItemId>) {
        self.endpoints
            .get(&transition)
            .copied()
            .unwrap_or((None, None))
    }

    fn adjacency_of(&self, doc: &Document, state: ItemId) -> ModelResult<Option<&Adjacency>> {
        match doc.kind(state) {
            Some(kind) if kind.is_state() => Ok(self.adjacency.get(&state)),
            kind => Err(ModelError::not_a_state(state, kind)),
        }
    }

    /// Transitions ending at `state`.
    pub fn in_transitions(&self, doc: &Document, state: ItemId) -> ModelResult<&[ItemId]> {
        Ok(self
            .adjacency_of(doc, state)?
            .map(|a| a.incoming.as_slice())
            .unwrap_or(&[]))
    }

    /// Transitions starting at `state`.
    pub fn out_transitions(&self, doc: &Document, state: ItemId) -> ModelResult<&[ItemId]> {
        Ok(self
            .adjacency_of(doc, state)?
            .map(|a| a.outgoing.as_slice())
            .unwrap_or(&[]))
    }

    /// The whole document as one graph: every transition is interior.
    pub fn graph_info(&self) -> GraphInfo {
        GraphInfo {
            states_and_statecharts: self.states.union(&self.statecharts).copied().collect(),
            transitions: self.transitions.clone(),
            interior_transitions: self.transitions.clone(),
            in_transitions: BTreeSet::new(),
            out_transitions: BTreeSet::new(),
        }
    }

    /// Classify the transitions touching `items` and their descendants.
    pub fn subgraph_info(&self, doc: &Document, items: &[ItemId]) -> GraphInfo {
        let mut info = GraphInfo::default();
        let mut states = Vec::new();
        for &item in items {
            for id in doc.descendants(item) {
                match doc.kind(id) {
                    Some(kind) if kind.is_state() => {
                        info.states_and_statecharts.insert(id);
                        states.push(id);
                    }
                    Some(ItemKind::Statechart) => {
                        info.states_and_statecharts.insert(id);
                    }
                    _ => {}
                }
            }
        }

        for state in states {
            let Some(adjacency) = self.adjacency.get(&state) else {
                continue;
            };
            for &transition in adjacency.incoming.iter().chain(&adjacency.outgoing) {
                // Self-loops are reached twice.
                if !info.transitions.insert(transition) {
                    continue;
                }
                let (src, dst) = self.endpoints(transition);
                let src_inside = src.is_some_and(|s| info.states_and_statecharts.contains(&s));
                let dst_inside = dst.is_some_and(|d| info.states_and_statecharts.contains(&d));
                match (src_inside, dst_inside) {
                    (true, true) => info.interior_transitions.insert(transition),
                    (true, false) => info.out_transitions.insert(transition),
                    (false, true) => info.in_transitions.insert(transition),
                    (false, false) => false,
                };
            }
        }
        info
    }

    /// Flood-fill over transitions from `seed`, following incoming edges when
    /// `upstream` and outgoing edges when `downstream`. Non-states in `seed`
    /// are ignored.
    pub fn connected_states(
        &self,
        doc: &Document,
        seed: &[ItemId],
        upstream: bool,
        downstream: bool,
    ) -> BTreeSet<ItemId> {
        let mut result = BTreeSet::new();
        let mut stack: Vec<ItemId> = seed.to_vec();
        while let Some(item) = stack.pop() {
            if !doc.kind(item).is_some_and(|k| k.is_state()) || !result.insert(item) {
                continue;
            }
            let Some(adjacency) = self.adjacency.get(&item) else {
                continue;
            };
            if upstream {
                for &transition in &adjacency.incoming {
                    if let (Some(src), _) = self.endpoints(transition) {
                        if !result.contains(&src) {
                            stack.push(src);
                        }
                    }
                }
            }
            if downstream {
                for &transition in &adjacency.outgoing {
                    if let (_, Some(dst)) = self.endpoints(transition) {
                        if !result.contains(&dst) {
                            stack.push(dst);
                        }
                    }
                }
            }
        }
        result
    }

    /// The ancestor of `item` directly below the root statechart. Returns
    /// `item` itself when it is a child of the root, or the root.
    pub fn top_level_container_of(&self, doc: &Document, item: ItemId) -> ItemId {
        let mut result = item;
        let mut current = Some(item);
        while let Some(id) = current {
            if id == self.root {
                break;
            }
            result = id;
            current = doc.parent(id);
        }
        if item == self.root {
            self.root
        } else {
            result
        }
    }

    /// Transition graph over tracked states. Edges carry transition ids;
    /// transitions with an untracked endpoint are left out.
    pub fn to_petgraph(&self) -> (DiGraph<ItemId, ItemId>, HashMap<ItemId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut id_to_index = HashMap::new();

        for &state in &self.states {
            id_to_index.insert(state, graph.add_node(state));
        }
        for &transition in &self.transitions {
            if let (Some(src), Some(dst)) = self.endpoints(transition) {
                if let (Some(&from), Some(&to)) = (id_to_index.get(&src), id_to_index.get(&dst)) {
                    graph.add_edge(from, to, transition);
                }
            }
        }

        (graph, id_to_index)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    fn insert_item(&mut self, doc: &Document, id: ItemId) {
        match doc.kind(id) {
            Some(ItemKind::Transition) => self.insert_transition(doc, id),
            Some(ItemKind::Statechart) => {
                self.statecharts.insert(id);
                for &child in doc.children(id) {
                    self.insert_item(doc, child);
                }
            }
            Some(kind) if kind.is_state() => {
                self.states.insert(id);
                self.adjacency.entry(id).or_default();
                for &child in doc.children(id) {
                    self.insert_item(doc, child);
                }
            }
            _ => {}
        }
    }

    fn remove_item(&mut self, doc: &Document, id: ItemId) {
        match doc.kind(id) {
            Some(ItemKind::Transition) => self.remove_transition(id),
            Some(ItemKind::Statechart) => {
                self.statecharts.remove(&id);
                for &child in doc.children(id) {
                    self.remove_item(doc, child);
                }
            }
            Some(kind) if kind.is_state() => {
                self.states.remove(&id);
                for &child in doc.children(id) {
                    self.remove_item(doc, child);
                }
                self.discard_if_unused(id);
            }
            _ => {}
        }
    }

    fn insert_transition(&mut self, doc: &Document, id: ItemId) {
        if !self.transitions.insert(id) {
            return;
        }
        let src = doc.resolve_src(id);
        let dst = doc.resolve_dst(id);
        if let Some(src) = src {
            self.adjacency.entry(src).or_default().outgoing.push(id);
        }
        if let Some(dst) = dst {
            self.adjacency.entry(dst).or_default().incoming.push(id);
        }
        self.endpoints.insert(id, (src, dst));
        trace!(transition = %id, ?src, ?dst, "registered transition");
    }

    fn remove_transition(&mut self, id: ItemId) {
        if !self.transitions.remove(&id) {
            return;
        }
        let (src, dst) = self.endpoints.remove(&id).unwrap_or((None, None));
        if let Some(src) = src {
            if let Some(adjacency) = self.adjacency.get_mut(&src) {
                adjacency.outgoing.retain(|&t| t != id);
            }
            self.discard_if_unused(src);
        }
        if let Some(dst) = dst {
            if let Some(adjacency) = self.adjacency.get_mut(&dst) {
                adjacency.incoming.retain(|&t| t != id);
            }
            self.discard_if_unused(dst);
        }
        trace!(transition = %id, "unregistered transition");
    }

    fn discard_if_unused(&mut self, state: ItemId) {
        if !self.states.contains(&state)
            && self.adjacency.get(&state).is_some_and(Adjacency::is_empty)
        {
            self.adjacency.remove(&state);
        }
    }
}

impl ChangeObserver for GraphIndex {
    fn on_change(&mut self, doc: &Document, event: &ChangeEvent) {
        match event {
            ChangeEvent::Inserted { parent, item, .. } => {
                if self.is_tracked(*parent) {
                    self.insert_item(doc, *item);
                }
            }
            ChangeEvent::Removed { parent, item, .. } => {
                if self.is_tracked(*parent) {
                    self.remove_item(doc, *item);
                }
            }
            ChangeEvent::Changed { item, attr, .. } => {
                if attr.is_reference() && self.transitions.contains(item) {
                    self.remove_transition(*item);
                    self.insert_transition(doc, *item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statechart_core::{Attr, AttrValue, Item, PseudostateKind, State, Statechart, Transition};

    struct Fixture {
        doc: Document,
        index: GraphIndex,
    }

    impl Fixture {
        fn new() -> Self {
            let doc = Document::new();
            let index = GraphIndex::new(&doc);
            Self { doc, index }
        }

        fn root(&self) -> ItemId {
            self.doc.root()
        }

        fn add(&mut self, parent: ItemId, item: impl Into<Item>) -> ItemId {
            let id = self.doc.new_item(item);
            let event = self.doc.append(parent, id).unwrap();
            self.index.on_change(&self.doc, &event);
            id
        }

        fn state(&mut self) -> ItemId {
            let root = self.root();
            self.add(root, State::new("s", 0.0, 0.0))
        }

        fn transition(&mut self, src: ItemId, dst: ItemId) -> ItemId {
            let root = self.root();
            self.add(root, Transition::new(src, dst))
        }

        fn remove(&mut self, item: ItemId) {
            let parent = self.doc.parent(item).unwrap();
            let index = self.doc.index_of(parent, item).unwrap();
            let event = self.doc.remove(parent, index).unwrap();
            self.index.on_change(&self.doc, &event);
        }

        fn ins(&self, state: ItemId) -> Vec<ItemId> {
            self.index.in_transitions(&self.doc, state).unwrap().to_vec()
        }

        fn outs(&self, state: ItemId) -> Vec<ItemId> {
            self.index.out_transitions(&self.doc, state).unwrap().to_vec()
        }
    }

    fn set(ids: &[ItemId]) -> BTreeSet<ItemId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_graph_info() {
        let mut f = Fixture::new();
        let state1 = f.state();
        let state2 = f.state();
        let t1 = f.transition(state1, state2);

        let graph = f.index.graph_info();
        assert!(graph.states_and_statecharts.contains(&state1));
        assert!(graph.states_and_statecharts.contains(&state2));
        // The root statechart counts too.
        assert_eq!(graph.states_and_statecharts.len(), 3);
        assert_eq!(graph.transitions, set(&[t1]));
        assert_eq!(graph.interior_transitions, set(&[t1]));
        assert!(graph.in_transitions.is_empty());
        assert!(graph.out_transitions.is_empty());

        let input = f.state();
        let output = f.state();
        let t2 = f.transition(input, state1);
        let t3 = f.transition(state2, output);

        let graph = f.index.graph_info();
        assert_eq!(graph.states_and_statecharts.len(), 5);
        assert_eq!(graph.interior_transitions, set(&[t1, t2, t3]));
        assert!(graph.in_transitions.is_empty());
        assert!(graph.out_transitions.is_empty());
    }

    #[test]
    fn test_subgraph_info() {
        let mut f = Fixture::new();
        let state1 = f.state();
        let state2 = f.state();
        let t1 = f.transition(state1, state2);

        let sub = f.index.subgraph_info(&f.doc, &[state1, state2]);
        assert_eq!(sub.states_and_statecharts, set(&[state1, state2]));
        assert_eq!(sub.transitions, set(&[t1]));
        assert_eq!(sub.interior_transitions, set(&[t1]));
        assert!(sub.in_transitions.is_empty());
        assert!(sub.out_transitions.is_empty());

        let input = f.state();
        let output = f.state();
        let t2 = f.transition(input, state1);
        let t3 = f.transition(state2, output);

        let sub = f.index.subgraph_info(&f.doc, &[state1, state2]);
        assert_eq!(sub.states_and_statecharts.len(), 2);
        assert_eq!(sub.transitions, set(&[t1, t2, t3]));
        assert_eq!(sub.interior_transitions, set(&[t1]));
        assert_eq!(sub.in_transitions, set(&[t2]));
        assert_eq!(sub.out_transitions, set(&[t3]));
    }

    #[test]
    fn test_subgraph_self_loop_counted_once() {
        let mut f = Fixture::new();
        let state = f.state();
        let other = f.state();
        let looped = f.transition(state, state);
        let _out = f.transition(state, other);

        let sub = f.index.subgraph_info(&f.doc, &[state]);
        assert_eq!(sub.transitions.len(), 2);
        assert_eq!(sub.interior_transitions, set(&[looped]));
        assert!(!sub.out_transitions.contains(&looped));
        assert!(!sub.in_transitions.contains(&looped));
    }

    #[test]
    fn test_subgraph_includes_nested_states() {
        let mut f = Fixture::new();
        let outer = f.state();
        let region = f.add(outer, Statechart::default());
        let inner = f.add(region, State::new("inner", 0.0, 0.0));
        let sibling = f.state();
        let t = f.transition(sibling, inner);

        let sub = f.index.subgraph_info(&f.doc, &[outer]);
        assert_eq!(sub.states_and_statecharts, set(&[outer, region, inner]));
        assert_eq!(sub.in_transitions, set(&[t]));
    }

    #[test]
    fn test_adjacency_order() {
        let mut f = Fixture::new();
        let state1 = f.state();
        let state2 = f.state();
        let t1 = f.transition(state1, state2);
        let input = f.state();
        let output = f.state();
        let t2 = f.transition(input, state1);
        let t3 = f.transition(input, state2);
        let t4 = f.transition(state2, output);

        assert_eq!(f.ins(input), vec![]);
        assert_eq!(f.outs(input), vec![t2, t3]);
        assert_eq!(f.ins(state1), vec![t2]);
        assert_eq!(f.outs(state1), vec![t1]);
        assert_eq!(f.ins(state2), vec![t1, t3]);
        assert_eq!(f.outs(state2), vec![t4]);
    }

    #[test]
    fn test_in_transitions_requires_state() {
        let f = Fixture::new();
        let root = f.root();
        assert!(matches!(
            f.index.in_transitions(&f.doc, root),
            Err(ModelError::NotAState { .. })
        ));
        assert!(matches!(
            f.index.out_transitions(&f.doc, ItemId(404)),
            Err(ModelError::NotAState { kind: None, .. })
        ));
    }

    #[test]
    fn test_reference_change_moves_transition() {
        let mut f = Fixture::new();
        let a = f.state();
        let b = f.state();
        let c = f.state();
        let t = f.transition(a, b);

        let event = f.doc.set_attr(t, Attr::DstId, AttrValue::reference(c)).unwrap();
        f.index.on_change(&f.doc, &event);

        assert!(f.ins(b).is_empty());
        assert_eq!(f.ins(c), vec![t]);
        assert_eq!(f.outs(a), vec![t]);
    }

    #[test]
    fn test_removed_subtree_is_untracked() {
        let mut f = Fixture::new();
        let outer = f.state();
        let region = f.add(outer, Statechart::default());
        let inner = f.add(region, State::new("inner", 0.0, 0.0));
        let inner_t = f.add(region, Transition::new(inner, inner));

        f.remove(outer);
        assert!(!f.index.is_tracked(outer));
        assert!(!f.index.is_tracked(region));
        assert!(!f.index.is_tracked(inner));
        assert!(!f.index.is_tracked_transition(inner_t));
    }

    #[test]
    fn test_reinserted_state_keeps_dangling_transitions() {
        let mut f = Fixture::new();
        let a = f.state();
        let b = f.state();
        let t = f.transition(a, b);

        f.remove(a);
        assert!(f.index.is_tracked_transition(t));
        assert!(!f.index.is_tracked_state(a));

        let root = f.root();
        let event = f.doc.append(root, a).unwrap();
        f.index.on_change(&f.doc, &event);
        assert_eq!(f.outs(a), vec![t]);
        assert_eq!(f.ins(b), vec![t]);
    }

    #[test]
    fn test_insert_into_detached_parent_is_ignored() {
        let mut f = Fixture::new();
        let detached = f.doc.new_item(Statechart::default());
        let state = f.add(detached, State::new("x", 0.0, 0.0));
        assert!(!f.index.is_tracked(state));
    }

    #[test]
    fn test_connected_states() {
        let mut f = Fixture::new();
        let a = f.state();
        let b = f.state();
        let c = f.state();
        let d = f.state();
        f.transition(a, b);
        f.transition(b, c);
        f.transition(c, a);
        f.transition(d, b);

        assert_eq!(f.index.connected_states(&f.doc, &[b], false, true), set(&[a, b, c]));
        assert_eq!(
            f.index.connected_states(&f.doc, &[b], true, false),
            set(&[a, b, c, d])
        );
        assert_eq!(f.index.connected_states(&f.doc, &[d], false, false), set(&[d]));
        let root = f.root();
        assert!(f.index.connected_states(&f.doc, &[root], true, true).is_empty());
    }

    #[test]
    fn test_top_level_container() {
        let mut f = Fixture::new();
        let outer = f.state();
        let region = f.add(outer, Statechart::default());
        let inner = f.add(region, Item::pseudostate(PseudostateKind::Start, 0.0, 0.0));

        assert_eq!(f.index.top_level_container_of(&f.doc, inner), outer);
        assert_eq!(f.index.top_level_container_of(&f.doc, region), outer);
        assert_eq!(f.index.top_level_container_of(&f.doc, outer), outer);
        let root = f.root();
        assert_eq!(f.index.top_level_container_of(&f.doc, root), root);
    }

    #[test]
    fn test_to_petgraph() {
        let mut f = Fixture::new();
        let a = f.state();
        let b = f.state();
        f.transition(a, b);
        f.transition(b, ItemId(999));

        let (graph, ids) = f.index.to_petgraph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(ids[&a], ids[&b]));
    }
}
