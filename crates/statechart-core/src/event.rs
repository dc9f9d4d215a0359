//! Change notifications emitted by document mutations.

use serde::{Deserialize, Serialize};

use crate::{Document, ItemId};

/// Mutable attributes of document items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attr {
    Name,
    Entry,
    Exit,
    Event,
    Guard,
    Action,
    X,
    Y,
    Width,
    Height,
    /// Transition source reference.
    SrcId,
    /// Transition destination reference.
    DstId,
    T1,
    T2,
    Pt,
}

impl Attr {
    /// Attributes holding an id reference to another item.
    pub fn is_reference(&self) -> bool {
        matches!(self, Attr::SrcId | Attr::DstId)
    }

    /// Key used by the document format.
    pub fn key(&self) -> &'static str {
        match self {
            Attr::Name => "name",
            Attr::Entry => "entry",
            Attr::Exit => "exit",
            Attr::Event => "event",
            Attr::Guard => "guard",
            Attr::Action => "action",
            Attr::X => "x",
            Attr::Y => "y",
            Attr::Width => "width",
            Attr::Height => "height",
            Attr::SrcId => "srcId",
            Attr::DstId => "dstId",
            Attr::T1 => "t1",
            Attr::T2 => "t2",
            Attr::Pt => "pt",
        }
    }
}

impl std::str::FromStr for Attr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let attr = match s {
            "name" => Attr::Name,
            "entry" => Attr::Entry,
            "exit" => Attr::Exit,
            "event" => Attr::Event,
            "guard" => Attr::Guard,
            "action" => Attr::Action,
            "x" => Attr::X,
            "y" => Attr::Y,
            "width" => Attr::Width,
            "height" => Attr::Height,
            "srcId" => Attr::SrcId,
            "dstId" => Attr::DstId,
            "t1" => Attr::T1,
            "t2" => Attr::T2,
            "pt" => Attr::Pt,
            _ => return Err(format!("unknown attribute: {}", s)),
        };
        Ok(attr)
    }
}

/// Value of an [`Attr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(Option<String>),
    Number(Option<f64>),
    Ref(Option<ItemId>),
}

impl AttrValue {
    pub fn text(value: impl Into<String>) -> Self {
        AttrValue::Text(Some(value.into()))
    }

    pub fn number(value: f64) -> Self {
        AttrValue::Number(Some(value))
    }

    pub fn reference(id: ItemId) -> Self {
        AttrValue::Ref(Some(id))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => *n,
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<ItemId> {
        match self {
            AttrValue::Ref(id) => *id,
            _ => None,
        }
    }
}

/// A single structural or attribute mutation.
///
/// Events are delivered synchronously, in mutation order, after the document
/// has been updated. Removed items stay in the arena, so observers can still
/// walk a removed subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// `item` was inserted into `parent` at `index`.
    Inserted {
        parent: ItemId,
        index: usize,
        item: ItemId,
    },
    /// `item` was removed from `parent` at `index`.
    Removed {
        parent: ItemId,
        index: usize,
        item: ItemId,
    },
    /// `attr` of `item` changed; `old` holds the previous value.
    Changed {
        item: ItemId,
        attr: Attr,
        old: AttrValue,
    },
}

impl ChangeEvent {
    /// The item the event is about.
    pub fn item(&self) -> ItemId {
        match self {
            ChangeEvent::Inserted { item, .. }
            | ChangeEvent::Removed { item, .. }
            | ChangeEvent::Changed { item, .. } => *item,
        }
    }
}

/// Receives change events as they happen.
pub trait ChangeObserver {
    /// Called once per mutation, after `doc` reflects the change.
    fn on_change(&mut self, doc: &Document, event: &ChangeEvent);
}
