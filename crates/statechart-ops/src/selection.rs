//! Ordered, duplicate-free selection set.

use statechart_core::{Document, ItemId};

/// The items the user has selected, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<ItemId>,
}

impl Selection {
    pub fn contents(&self) -> &[ItemId] {
        &self.items
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Select `item`. Returns false if it was already selected.
    pub fn add(&mut self, item: ItemId) -> bool {
        if self.contains(item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ItemId>) {
        for item in items {
            self.add(item);
        }
    }

    /// Deselect `item`. Returns false if it wasn't selected.
    pub fn remove(&mut self, item: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|&i| i != item);
        self.items.len() != before
    }

    /// Replace the selection.
    pub fn set(&mut self, items: impl IntoIterator<Item = ItemId>) {
        self.items.clear();
        self.extend(items);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Selected items that have no selected ancestor.
    pub fn reduce(&self, doc: &Document) -> Vec<ItemId> {
        self.items
            .iter()
            .copied()
            .filter(|&item| {
                !doc.ancestors(item)
                    .into_iter()
                    .skip(1)
                    .any(|ancestor| self.contains(ancestor))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statechart_core::{State, Statechart};

    #[test]
    fn test_add_is_ordered_and_unique() {
        let mut selection = Selection::default();
        assert!(selection.add(ItemId(3)));
        assert!(selection.add(ItemId(1)));
        assert!(!selection.add(ItemId(3)));
        assert_eq!(selection.contents(), &[ItemId(3), ItemId(1)]);

        assert!(selection.remove(ItemId(3)));
        assert!(!selection.remove(ItemId(3)));
        assert_eq!(selection.contents(), &[ItemId(1)]);

        selection.set([ItemId(5), ItemId(5), ItemId(6)]);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_reduce_drops_selected_descendants() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.new_item(State::new("outer", 0.0, 0.0));
        doc.append(root, outer).unwrap();
        let region = doc.new_item(Statechart::default());
        doc.append(outer, region).unwrap();
        let inner = doc.new_item(State::new("inner", 0.0, 0.0));
        doc.append(region, inner).unwrap();
        let other = doc.new_item(State::new("other", 0.0, 0.0));
        doc.append(root, other).unwrap();

        let mut selection = Selection::default();
        selection.set([inner, outer, other]);
        assert_eq!(selection.reduce(&doc), vec![outer, other]);

        selection.set([inner, other]);
        assert_eq!(selection.reduce(&doc), vec![inner, other]);
    }
}
