//! Core domain types for statechart documents.
//!
//! A statechart document is a tree of items owned by a [`Document`] arena:
//! the root [`Statechart`] holds states, pseudostates and transitions; a
//! composite [`State`] holds one or more child statecharts, one per
//! concurrent region. Transitions reference their endpoints by [`ItemId`].

use serde::{Deserialize, Serialize};

mod document;
mod error;
mod event;
pub mod format;
mod geometry;

pub use document::{Document, IdMap, Initializer};
pub use error::{CoreError, CoreResult};
pub use event::{Attr, AttrValue, ChangeEvent, ChangeObserver};
pub use format::ItemRecord;
pub use geometry::{FrameLayout, Layout, Point};

// =============================================================================
// Identifiers and kinds
// =============================================================================

/// Stable identifier for items within a [`Document`].
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Largest id a loaded document may use. Fresh ids are allocated above
    /// the loaded ones, so this leaves room for them.
    pub const MAX: ItemId = ItemId(i64::MAX as u64);
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The marker kinds a pseudostate can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PseudostateKind {
    /// Initial state of a region.
    Start,
    /// Final state of a region.
    Stop,
    /// Shallow history.
    History,
    /// Deep history.
    HistoryDeep,
}

impl PseudostateKind {
    /// Type tag used by the document format.
    pub fn tag(&self) -> &'static str {
        match self {
            PseudostateKind::Start => "start",
            PseudostateKind::Stop => "stop",
            PseudostateKind::History => "history",
            PseudostateKind::HistoryDeep => "history*",
        }
    }
}

/// Variant tag of an [`Item`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// A true (atomic or composite) state.
    State,
    /// A start, stop or history marker.
    Pseudostate(PseudostateKind),
    /// A region container.
    Statechart,
    /// A directed edge between two states.
    Transition,
}

impl ItemKind {
    /// True states and pseudostates.
    pub fn is_state(&self) -> bool {
        matches!(self, ItemKind::State | ItemKind::Pseudostate(_))
    }

    pub fn is_true_state(&self) -> bool {
        matches!(self, ItemKind::State)
    }

    pub fn is_pseudostate(&self) -> bool {
        matches!(self, ItemKind::Pseudostate(_))
    }

    pub fn is_start(&self) -> bool {
        matches!(self, ItemKind::Pseudostate(PseudostateKind::Start))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, ItemKind::Pseudostate(PseudostateKind::Stop))
    }

    pub fn is_history(&self) -> bool {
        matches!(
            self,
            ItemKind::Pseudostate(PseudostateKind::History | PseudostateKind::HistoryDeep)
        )
    }

    /// Start and history pseudostates, which enter their own region only.
    pub fn is_starting_state(&self) -> bool {
        self.is_start() || self.is_history()
    }

    pub fn is_statechart(&self) -> bool {
        matches!(self, ItemKind::Statechart)
    }

    pub fn is_state_or_statechart(&self) -> bool {
        self.is_state() || self.is_statechart()
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, ItemKind::Transition)
    }
}

// =============================================================================
// Items
// =============================================================================

/// A true state. Composite states own their child regions in `items`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Display name.
    pub name: String,
    /// Entry action text.
    pub entry: Option<String>,
    /// Exit action text.
    pub exit: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Child regions, each a [`Statechart`].
    pub items: Vec<ItemId>,
}

impl State {
    /// Create a named state at a position, with the default minimum size.
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            width: State::MIN_WIDTH,
            height: State::MIN_HEIGHT,
            ..Default::default()
        }
    }

    pub const MIN_WIDTH: f64 = 100.0;
    pub const MIN_HEIGHT: f64 = 60.0;
}

/// A pseudostate marker. Pseudostates never own regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pseudostate {
    pub kind: PseudostateKind,
    pub x: f64,
    pub y: f64,
}

impl Pseudostate {
    /// Pseudostates render as disks of this radius.
    pub const RADIUS: f64 = 8.0;

    pub fn new(kind: PseudostateKind, x: f64, y: f64) -> Self {
        Self { kind, x, y }
    }
}

/// An ordered container of states, pseudostates and transitions.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statechart {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub items: Vec<ItemId>,
}

impl Statechart {
    /// Create an empty region at a vertical offset within its state.
    pub fn at(y: f64) -> Self {
        Self {
            y,
            ..Default::default()
        }
    }
}

/// A directed, labeled edge between two states.
///
/// Either endpoint may be absent while a transition is being drawn.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub src: Option<ItemId>,
    pub dst: Option<ItemId>,
    pub event: Option<String>,
    pub guard: Option<String>,
    pub action: Option<String>,
    /// Attachment parameter on the source outline.
    pub t1: Option<f64>,
    /// Attachment parameter on the destination outline.
    pub t2: Option<f64>,
    /// Label attachment parameter along the rendered curve.
    pub pt: Option<f64>,
}

impl Transition {
    pub fn new(src: ItemId, dst: ItemId) -> Self {
        Self {
            src: Some(src),
            dst: Some(dst),
            ..Default::default()
        }
    }

    /// Human readable label: `event[guard]/action`.
    pub fn label(&self) -> String {
        let mut text = String::new();
        if let Some(event) = &self.event {
            text.push_str(event);
        }
        if let Some(guard) = &self.guard {
            text.push_str(&format!("[{}]", guard));
        }
        if let Some(action) = &self.action {
            text.push_str(&format!("/{}", action));
        }
        text
    }
}

/// Closed sum type over everything a statechart document can contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    State(State),
    Pseudostate(Pseudostate),
    Statechart(Statechart),
    Transition(Transition),
}

impl Item {
    /// Variant tag of this item.
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::State(_) => ItemKind::State,
            Item::Pseudostate(p) => ItemKind::Pseudostate(p.kind),
            Item::Statechart(_) => ItemKind::Statechart,
            Item::Transition(_) => ItemKind::Transition,
        }
    }

    /// Shorthand for a pseudostate item.
    pub fn pseudostate(kind: PseudostateKind, x: f64, y: f64) -> Self {
        Item::Pseudostate(Pseudostate::new(kind, x, y))
    }

    /// Ordered children, empty for leaf items.
    pub fn items(&self) -> &[ItemId] {
        match self {
            Item::State(s) => &s.items,
            Item::Statechart(s) => &s.items,
            Item::Pseudostate(_) | Item::Transition(_) => &[],
        }
    }

    pub(crate) fn items_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        match self {
            Item::State(s) => Some(&mut s.items),
            Item::Statechart(s) => Some(&mut s.items),
            Item::Pseudostate(_) | Item::Transition(_) => None,
        }
    }

    /// Local position in the parent frame. Transitions have none.
    pub fn position(&self) -> Point {
        match self {
            Item::State(s) => Point::new(s.x, s.y),
            Item::Pseudostate(p) => Point::new(p.x, p.y),
            Item::Statechart(s) => Point::new(s.x, s.y),
            Item::Transition(_) => Point::default(),
        }
    }

    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Item::Transition(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&State> {
        match self {
            Item::State(s) => Some(s),
            _ => None,
        }
    }
}

impl From<State> for Item {
    fn from(state: State) -> Self {
        Item::State(state)
    }
}

impl From<Pseudostate> for Item {
    fn from(pseudostate: Pseudostate) -> Self {
        Item::Pseudostate(pseudostate)
    }
}

impl From<Statechart> for Item {
    fn from(statechart: Statechart) -> Self {
        Item::Statechart(statechart)
    }
}

impl From<Transition> for Item {
    fn from(transition: Transition) -> Self {
        Item::Transition(transition)
    }
}
