//! Coordinate frames of nested items.
//!
//! Every item stores its position relative to its parent. Moving an item to a
//! new parent therefore needs the offset between the two parent frames, which
//! is supplied by a [`Layout`].

use serde::{Deserialize, Serialize};

use crate::{Document, Item, ItemId};

/// A 2-D point or offset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Geometry policy consumed by the editing engine.
pub trait Layout {
    /// Offset that converts `item`'s local position from its current parent's
    /// frame into `new_parent`'s frame.
    fn translation_to_parent(&self, doc: &Document, item: ItemId, new_parent: Option<ItemId>)
        -> Point;

    /// Vertical offset for a region appended below the existing regions of `state`.
    fn next_statechart_y(&self, doc: &Document, state: ItemId) -> f64;
}

/// Default layout: frames are nested by summing local positions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameLayout;

impl FrameLayout {
    /// Position of `item` in the root frame.
    pub fn global_position(doc: &Document, item: ItemId) -> Point {
        let mut position = Point::default();
        let mut current = Some(item);
        while let Some(id) = current {
            if let Some(item) = doc.item(id) {
                position = position + item.position();
            }
            current = doc.parent(id);
        }
        position
    }
}

impl Layout for FrameLayout {
    fn translation_to_parent(
        &self,
        doc: &Document,
        item: ItemId,
        new_parent: Option<ItemId>,
    ) -> Point {
        let from = doc
            .parent(item)
            .map(|p| Self::global_position(doc, p))
            .unwrap_or_default();
        let to = new_parent
            .map(|p| Self::global_position(doc, p))
            .unwrap_or_default();
        from - to
    }

    fn next_statechart_y(&self, doc: &Document, state: ItemId) -> f64 {
        doc.children(state)
            .last()
            .and_then(|&last| doc.item(last))
            .map(|last| match last {
                Item::Statechart(s) => s.y + s.height,
                _ => 0.0,
            })
            .unwrap_or(0.0)
    }
}
