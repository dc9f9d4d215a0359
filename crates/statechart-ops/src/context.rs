//! ChartContext - one open statechart document and everything derived from it.
//!
//! The context owns the document tree together with its graph index, the
//! selection, the clipboard scrap, the open transaction and the layout
//! policy. Every mutation goes through [`ChartContext::apply`], which updates
//! the index first, then registered observers, then the transaction log.

use std::collections::BTreeSet;

use statechart_core::{
    Attr, AttrValue, ChangeEvent, ChangeObserver, Document, FrameLayout, Item, ItemId, Layout,
};
use tracing::debug;

use crate::config::Config;
use crate::error::ModelResult;
use crate::index::{GraphIndex, GraphInfo};
use crate::selection::Selection;
use crate::transaction::Transaction;
use crate::validity;

/// An open statechart document.
pub struct ChartContext {
    /// Editing configuration.
    pub config: Config,
    pub(crate) doc: Document,
    pub(crate) index: GraphIndex,
    pub(crate) layout: Box<dyn Layout>,
    observers: Vec<Box<dyn ChangeObserver>>,
    pub(crate) selection: Selection,
    pub(crate) scrap: Vec<ItemId>,
    pub(crate) transaction: Option<Transaction>,
}

impl std::fmt::Debug for ChartContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartContext")
            .field("config", &self.config)
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("scrap", &self.scrap)
            .field("transaction", &self.transaction)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ChartContext {
    /// Open `doc`, indexing everything reachable from its root.
    pub fn new(doc: Document, config: Config) -> Self {
        let index = GraphIndex::new(&doc);
        debug!(
            states = index.states().len(),
            transitions = index.transitions().len(),
            "opened document"
        );
        Self {
            config,
            doc,
            index,
            layout: Box::new(FrameLayout),
            observers: Vec::new(),
            selection: Selection::default(),
            scrap: Vec::new(),
            transaction: None,
        }
    }

    /// Open a document from its JSON form.
    pub fn from_json(json: &str, config: Config) -> ModelResult<Self> {
        Ok(Self::new(Document::from_json(json)?, config))
    }

    /// Serialize the document, pretty-printed per configuration.
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(self.doc.to_json(self.config.pretty_json)?)
    }

    /// Close the context, keeping the document.
    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    /// The root statechart.
    pub fn root(&self) -> ItemId {
        self.doc.root()
    }

    /// Replace the geometry policy.
    pub fn set_layout(&mut self, layout: impl Layout + 'static) {
        self.layout = Box::new(layout);
    }

    /// Register an observer for every subsequent change.
    pub fn add_observer(&mut self, observer: impl ChangeObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Register an initializer run on every item the context creates.
    pub fn add_initializer(&mut self, initializer: impl Fn(ItemId, &mut Item) + 'static) {
        self.doc.add_initializer(initializer);
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Items currently held by the clipboard.
    pub fn scrap(&self) -> &[ItemId] {
        &self.scrap
    }

    // =========================================================================
    // Change dispatch
    // =========================================================================

    /// Deliver a change to the index, the observers and the open transaction.
    pub(crate) fn apply(&mut self, event: ChangeEvent) {
        self.index.on_change(&self.doc, &event);
        for observer in &mut self.observers {
            observer.on_change(&self.doc, &event);
        }
        if let Some(transaction) = &mut self.transaction {
            transaction.record(event);
        }
    }

    /// Insert a detached item at `index` of `parent`.
    pub fn insert(&mut self, parent: ItemId, index: usize, child: ItemId) -> ModelResult<()> {
        let event = self.doc.insert(parent, index, child)?;
        self.apply(event);
        Ok(())
    }

    /// Remove the child at `index` of `parent`.
    pub fn remove(&mut self, parent: ItemId, index: usize) -> ModelResult<ItemId> {
        let event = self.doc.remove(parent, index)?;
        let removed = event.item();
        self.apply(event);
        Ok(removed)
    }

    /// Change one attribute of an item.
    pub fn set_attr(&mut self, item: ItemId, attr: Attr, value: AttrValue) -> ModelResult<()> {
        let event = self.doc.set_attr(item, attr, value)?;
        self.apply(event);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn parent(&self, item: ItemId) -> Option<ItemId> {
        self.doc.parent(item)
    }

    /// Transitions ending at `state`.
    pub fn in_transitions(&self, state: ItemId) -> ModelResult<&[ItemId]> {
        self.index.in_transitions(&self.doc, state)
    }

    /// Transitions starting at `state`.
    pub fn out_transitions(&self, state: ItemId) -> ModelResult<&[ItemId]> {
        self.index.out_transitions(&self.doc, state)
    }

    pub fn graph_info(&self) -> GraphInfo {
        self.index.graph_info()
    }

    pub fn subgraph_info(&self, items: &[ItemId]) -> GraphInfo {
        self.index.subgraph_info(&self.doc, items)
    }

    pub fn connected_states(
        &self,
        seed: &[ItemId],
        upstream: bool,
        downstream: bool,
    ) -> BTreeSet<ItemId> {
        self.index
            .connected_states(&self.doc, seed, upstream, downstream)
    }

    pub fn top_level_container_of(&self, item: ItemId) -> ItemId {
        self.index.top_level_container_of(&self.doc, item)
    }

    pub fn can_add_state(&self, state: ItemId, statechart: ItemId) -> bool {
        validity::can_add_state(&self.doc, state, statechart)
    }

    pub fn is_valid_transition(&self, src: Option<ItemId>, dst: Option<ItemId>) -> bool {
        validity::is_valid_transition(&self.doc, src, dst)
    }

    pub fn is_valid_statechart(&self, statechart: ItemId) -> bool {
        validity::is_valid_statechart(&self.doc, statechart)
    }
}
