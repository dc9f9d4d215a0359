//! Statechart well-formedness predicates.
//!
//! Everything here is pure: it reads the document and never mutates it, so
//! it can drive drop-target feedback before an edit is committed.

use std::fmt;

use serde::Serialize;
use statechart_core::{Document, ItemId, ItemKind};

/// A reason a statechart fails [`is_valid_statechart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A transition whose endpoints may not be connected.
    InvalidTransition {
        transition: ItemId,
        src: Option<ItemId>,
        dst: Option<ItemId>,
    },
    /// A region with more than one start pseudostate.
    MultipleStartStates { statechart: ItemId, count: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoint = |id: &Option<ItemId>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
        match self {
            Violation::InvalidTransition {
                transition,
                src,
                dst,
            } => write!(
                f,
                "invalid transition {} ({} -> {})",
                transition,
                endpoint(src),
                endpoint(dst)
            ),
            Violation::MultipleStartStates { statechart, count } => {
                write!(f, "region {} has {} start states", statechart, count)
            }
        }
    }
}

fn is_start(doc: &Document, id: ItemId) -> bool {
    doc.kind(id).is_some_and(|k| k.is_start())
}

/// Whether `state` may be placed in `statechart`: a region holds at most one
/// start pseudostate.
pub fn can_add_state(doc: &Document, state: ItemId, statechart: ItemId) -> bool {
    if !is_start(doc, state) {
        return true;
    }
    !doc
        .children(statechart)
        .iter()
        .any(|&child| child != state && is_start(doc, child))
}

/// Whether a transition may connect `src` to `dst`.
pub fn is_valid_transition(doc: &Document, src: Option<ItemId>, dst: Option<ItemId>) -> bool {
    let (Some(src), Some(dst)) = (src, dst) else {
        return false;
    };
    let (Some(src_kind), Some(dst_kind)) = (
        doc.kind(src).filter(ItemKind::is_state),
        doc.kind(dst).filter(ItemKind::is_state),
    ) else {
        return false;
    };

    // Only true states may loop to themselves.
    if src == dst {
        return src_kind.is_true_state();
    }
    if dst_kind.is_start() || src_kind.is_stop() {
        return false;
    }
    // Start and history markers only enter their own region.
    if src_kind.is_starting_state() {
        return doc.parent(src).is_some() && doc.parent(src) == doc.parent(dst);
    }
    doc.lowest_common_ancestor(src, dst)
        .and_then(|lca| doc.kind(lca))
        .is_some_and(|k| k.is_statechart())
}

/// [`is_valid_transition`] for an existing transition item.
pub fn is_valid_transition_item(doc: &Document, transition: ItemId) -> bool {
    is_valid_transition(doc, doc.resolve_src(transition), doc.resolve_dst(transition))
}

/// Every violation in `statechart` and the regions nested below it.
pub fn violations(doc: &Document, statechart: ItemId) -> Vec<Violation> {
    let mut found = Vec::new();
    collect_violations(doc, statechart, &mut found);
    found
}

fn collect_violations(doc: &Document, statechart: ItemId, found: &mut Vec<Violation>) {
    let mut starts = 0;
    for &child in doc.children(statechart) {
        match doc.kind(child) {
            Some(ItemKind::Transition) => {
                if !is_valid_transition_item(doc, child) {
                    let t = doc.item(child).and_then(|item| item.as_transition());
                    found.push(Violation::InvalidTransition {
                        transition: child,
                        src: t.and_then(|t| t.src),
                        dst: t.and_then(|t| t.dst),
                    });
                }
            }
            Some(ItemKind::State) => {
                for &region in doc.children(child) {
                    collect_violations(doc, region, found);
                }
            }
            Some(kind) if kind.is_start() => starts += 1,
            _ => {}
        }
    }
    if starts > 1 {
        found.push(Violation::MultipleStartStates {
            statechart,
            count: starts,
        });
    }
}

/// True iff every transition in `statechart` is valid, every nested region
/// is valid, and the region holds at most one start pseudostate.
pub fn is_valid_statechart(doc: &Document, statechart: ItemId) -> bool {
    violations(doc, statechart).is_empty()
}
