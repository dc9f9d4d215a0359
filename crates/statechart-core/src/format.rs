//! JSON document format.
//!
//! A document is its root statechart record, nested recursively:
//!
//! ```text
//! {"type": "statechart", "items": [
//!     {"type": "state", "id": 2, "name": "Idle", "x": 8, "y": 30, "items": [...]},
//!     {"type": "start", "id": 3, "x": 40, "y": 8},
//!     {"type": "transition", "id": 4, "srcId": 3, "dstId": 2, "event": "go"}
//! ]}
//! ```
//!
//! Detached items are never written. Missing ids are assigned on load.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::{Document, Item, ItemId, Pseudostate, PseudostateKind, State, Statechart, Transition};

/// Serialized form of a state.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemRecord>,
}

/// Serialized form of a region or the root statechart.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatechartRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

/// Serialized form of a pseudostate.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudostateRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Serialized form of a transition.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pt: Option<f64>,
}

/// A document item tagged by its `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemRecord {
    Statechart(StatechartRecord),
    State(StateRecord),
    Start(PseudostateRecord),
    Stop(PseudostateRecord),
    History(PseudostateRecord),
    #[serde(rename = "history*", alias = "history-deep")]
    HistoryDeep(PseudostateRecord),
    Transition(TransitionRecord),
}

impl ItemRecord {
    fn id(&self) -> Option<ItemId> {
        match self {
            ItemRecord::Statechart(r) => r.id,
            ItemRecord::State(r) => r.id,
            ItemRecord::Start(r)
            | ItemRecord::Stop(r)
            | ItemRecord::History(r)
            | ItemRecord::HistoryDeep(r) => r.id,
            ItemRecord::Transition(r) => r.id,
        }
    }

    fn children(&self) -> &[ItemRecord] {
        match self {
            ItemRecord::Statechart(r) => &r.items,
            ItemRecord::State(r) => &r.items,
            _ => &[],
        }
    }

    fn pseudostate(kind: PseudostateKind, id: ItemId, p: &Pseudostate) -> Self {
        let record = PseudostateRecord {
            id: Some(id),
            x: p.x,
            y: p.y,
        };
        match kind {
            PseudostateKind::Start => ItemRecord::Start(record),
            PseudostateKind::Stop => ItemRecord::Stop(record),
            PseudostateKind::History => ItemRecord::History(record),
            PseudostateKind::HistoryDeep => ItemRecord::HistoryDeep(record),
        }
    }
}

/// Assigns ids on load: explicit ids are kept, missing ones come after the max.
struct Loader {
    nodes: Vec<(ItemId, Item, Option<ItemId>)>,
    seen: HashSet<ItemId>,
    next_id: u64,
}

impl Loader {
    fn collect_ids(record: &ItemRecord, max: &mut u64) {
        if let Some(id) = record.id() {
            *max = (*max).max(id.0);
        }
        for child in record.children() {
            Self::collect_ids(child, max);
        }
    }

    fn claim(&mut self, id: Option<ItemId>) -> CoreResult<ItemId> {
        let id = match id {
            Some(id) if id > ItemId::MAX => {
                return Err(CoreError::malformed(format!("item id {} out of range", id)));
            }
            Some(id) => id,
            None => {
                let id = ItemId(self.next_id);
                self.next_id = self
                    .next_id
                    .checked_add(1)
                    .ok_or_else(|| CoreError::malformed("item id out of range"))?;
                id
            }
        };
        if !self.seen.insert(id) {
            return Err(CoreError::malformed(format!("duplicate item id {}", id)));
        }
        Ok(id)
    }

    fn load(&mut self, record: &ItemRecord, parent: Option<ItemId>) -> CoreResult<ItemId> {
        let id = self.claim(record.id())?;
        let item = match record {
            ItemRecord::Statechart(r) => {
                let mut items = Vec::with_capacity(r.items.len());
                for child in &r.items {
                    if matches!(child, ItemRecord::Statechart(_)) {
                        return Err(CoreError::malformed(format!(
                            "statechart {} cannot directly contain a statechart",
                            id
                        )));
                    }
                    items.push(self.load(child, Some(id))?);
                }
                Item::Statechart(Statechart {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    items,
                })
            }
            ItemRecord::State(r) => {
                let mut items = Vec::with_capacity(r.items.len());
                for child in &r.items {
                    if !matches!(child, ItemRecord::Statechart(_)) {
                        return Err(CoreError::malformed(format!(
                            "state {} may only contain statecharts",
                            id
                        )));
                    }
                    items.push(self.load(child, Some(id))?);
                }
                Item::State(State {
                    name: r.name.clone(),
                    entry: r.entry.clone(),
                    exit: r.exit.clone(),
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    items,
                })
            }
            ItemRecord::Start(r) => Item::pseudostate(PseudostateKind::Start, r.x, r.y),
            ItemRecord::Stop(r) => Item::pseudostate(PseudostateKind::Stop, r.x, r.y),
            ItemRecord::History(r) => Item::pseudostate(PseudostateKind::History, r.x, r.y),
            ItemRecord::HistoryDeep(r) => {
                Item::pseudostate(PseudostateKind::HistoryDeep, r.x, r.y)
            }
            ItemRecord::Transition(r) => Item::Transition(Transition {
                src: r.src_id,
                dst: r.dst_id,
                event: r.event.clone(),
                guard: r.guard.clone(),
                action: r.action.clone(),
                t1: r.t1,
                t2: r.t2,
                pt: r.pt,
            }),
        };
        self.nodes.push((id, item, parent));
        Ok(id)
    }
}

impl Document {
    /// Build a document from its root record.
    pub fn from_record(record: &ItemRecord) -> CoreResult<Self> {
        if !matches!(record, ItemRecord::Statechart(_)) {
            return Err(CoreError::malformed("the root item must be a statechart"));
        }
        let mut max = 0;
        Loader::collect_ids(record, &mut max);
        let mut loader = Loader {
            nodes: Vec::new(),
            seen: HashSet::new(),
            next_id: max
                .checked_add(1)
                .ok_or_else(|| CoreError::malformed("item id out of range"))?,
        };
        let root = loader.load(record, None)?;
        Ok(Document::from_nodes(root, loader.nodes, loader.next_id))
    }

    /// Serialize the tree reachable from the root.
    pub fn to_record(&self) -> ItemRecord {
        self.record_of(self.root())
    }

    fn record_of(&self, id: ItemId) -> ItemRecord {
        let children = || {
            self.children(id)
                .iter()
                .map(|&child| self.record_of(child))
                .collect::<Vec<_>>()
        };
        match self.item(id) {
            Some(Item::Statechart(s)) => ItemRecord::Statechart(StatechartRecord {
                id: Some(id),
                x: s.x,
                y: s.y,
                width: s.width,
                height: s.height,
                items: children(),
            }),
            Some(Item::State(s)) => ItemRecord::State(StateRecord {
                id: Some(id),
                x: s.x,
                y: s.y,
                width: s.width,
                height: s.height,
                name: s.name.clone(),
                entry: s.entry.clone(),
                exit: s.exit.clone(),
                items: children(),
            }),
            Some(Item::Pseudostate(p)) => ItemRecord::pseudostate(p.kind, id, p),
            Some(Item::Transition(t)) => ItemRecord::Transition(TransitionRecord {
                id: Some(id),
                src_id: t.src,
                dst_id: t.dst,
                event: t.event.clone(),
                guard: t.guard.clone(),
                action: t.action.clone(),
                t1: t.t1,
                t2: t.t2,
                pt: t.pt,
            }),
            None => ItemRecord::Statechart(StatechartRecord {
                id: Some(id),
                ..Default::default()
            }),
        }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let record: ItemRecord = serde_json::from_str(json)?;
        Self::from_record(&record)
    }

    /// Write the document as JSON.
    pub fn to_json(&self, pretty: bool) -> CoreResult<String> {
        let record = self.to_record();
        let json = if pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        Ok(json)
    }
}
