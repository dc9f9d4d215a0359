//! Selection-driven editing commands: copy, cut, paste, delete.

use statechart_core::{IdMap, ItemId, ItemKind, Point};
use tracing::debug;

use crate::context::ChartContext;
use crate::error::ModelResult;

impl ChartContext {
    /// Drop selected items whose ancestor is also selected.
    pub fn reduce_selection(&mut self) {
        let reduced = self.selection.reduce(&self.doc);
        self.selection.set(reduced);
    }

    /// Add every transition with both ends inside the selection.
    pub fn select_interior_transitions(&mut self) {
        let info = self.subgraph_info(self.selection.contents());
        self.selection.extend(info.interior_transitions);
    }

    /// Copy the selection to the clipboard. Selected transitions are replaced
    /// by the transitions interior to the selected states.
    pub fn do_copy(&mut self) -> ModelResult<()> {
        let transitions: Vec<ItemId> = self
            .selection
            .contents()
            .iter()
            .copied()
            .filter(|&item| self.doc.kind(item) == Some(ItemKind::Transition))
            .collect();
        for transition in transitions {
            self.selection.remove(transition);
        }
        self.select_interior_transitions();
        self.reduce_selection();

        let items = self.selection.contents().to_vec();
        let mut map = IdMap::new();
        let copies = self.copy_items(&items, &mut map)?;
        let old_scrap = std::mem::replace(&mut self.scrap, copies);
        self.doc.discard_detached(&old_scrap, &self.scrap);
        debug!(items = self.scrap.len(), "copied selection");
        Ok(())
    }

    /// Copy the selection, then delete it.
    pub fn do_cut(&mut self) -> ModelResult<()> {
        self.do_copy()?;
        self.do_delete()
    }

    /// Delete the selected items.
    pub fn do_delete(&mut self) -> ModelResult<()> {
        self.reduce_selection();
        let items = self.selection.contents().to_vec();
        self.delete_items(&items)
    }

    /// Paste a fresh copy of the clipboard into the root statechart and
    /// select it. Each paste lands `paste_offset` further from the original.
    pub fn do_paste(&mut self) -> ModelResult<Vec<ItemId>> {
        let offset = Point::new(self.config.paste_offset, self.config.paste_offset);
        let scrap = self.scrap.clone();
        for &item in &scrap {
            if self.doc.kind(item).is_some_and(|k| k.is_state()) {
                self.translate(item, offset)?;
            }
        }

        let mut map = IdMap::new();
        let copies = self.copy_items(&scrap, &mut map)?;
        self.add_items(&copies, None)?;
        self.selection.set(copies.iter().copied());
        debug!(items = copies.len(), "pasted clipboard");
        Ok(copies)
    }

    /// Select every state reachable from the selection, following outgoing
    /// transitions and, if `upstream`, incoming ones too.
    pub fn do_select_connected_states(&mut self, upstream: bool) {
        let states = self.connected_states(self.selection.contents(), upstream, true);
        self.selection.set(states);
    }
}
