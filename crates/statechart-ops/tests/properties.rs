//! Property-based tests for the graph index and the repair pass

use std::collections::BTreeSet;

use proptest::prelude::*;
use statechart_core::{Attr, AttrValue, Document, Item, ItemId, PseudostateKind, State, Transition};
use statechart_ops::{ChartContext, Config, GraphIndex};

#[derive(Debug, Clone)]
enum Op {
    AddState { parent: usize },
    AddPseudostate { kind: u8, parent: usize },
    AddTransition { src: usize, dst: usize },
    Delete { item: usize },
    Retarget { transition: usize, state: usize, source_end: bool },
    Move { item: usize, parent: usize, region: bool },
    Restore { item: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<usize>().prop_map(|parent| Op::AddState { parent }),
        1 => (0..4u8, any::<usize>()).prop_map(|(kind, parent)| Op::AddPseudostate { kind, parent }),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(src, dst)| Op::AddTransition { src, dst }),
        2 => any::<usize>().prop_map(|item| Op::Delete { item }),
        1 => (any::<usize>(), any::<usize>(), any::<bool>())
            .prop_map(|(transition, state, source_end)| Op::Retarget { transition, state, source_end }),
        2 => (any::<usize>(), any::<usize>(), prop::bool::weighted(0.25))
            .prop_map(|(item, parent, region)| Op::Move { item, parent, region }),
        1 => any::<usize>().prop_map(|item| Op::Restore { item }),
    ]
}

prop_compose! {
    fn arb_ops()(ops in prop::collection::vec(arb_op(), 0..40)) -> Vec<Op> {
        ops
    }
}

fn pick(items: &[ItemId], n: usize) -> Option<ItemId> {
    (!items.is_empty()).then(|| items[n % items.len()])
}

fn states(ctx: &ChartContext) -> Vec<ItemId> {
    ctx.index().states().iter().copied().collect()
}

fn containers(ctx: &ChartContext) -> Vec<ItemId> {
    let index = ctx.index();
    index.states().union(index.statecharts()).copied().collect()
}

fn regions(ctx: &ChartContext) -> Vec<ItemId> {
    let root = ctx.root();
    ctx.index().statecharts().iter().copied().filter(|&id| id != root).collect()
}

fn transitions(ctx: &ChartContext) -> Vec<ItemId> {
    ctx.index().transitions().iter().copied().collect()
}

fn pseudostate_kind(kind: u8) -> PseudostateKind {
    match kind {
        0 => PseudostateKind::Start,
        1 => PseudostateKind::Stop,
        2 => PseudostateKind::History,
        _ => PseudostateKind::HistoryDeep,
    }
}

/// Apply one edit. Picks wrap around the candidate lists; edits with no
/// candidates are skipped. A refused move must leave the chart as it was.
fn apply(ctx: &mut ChartContext, op: &Op, removed: &mut Vec<ItemId>) -> Result<(), TestCaseError> {
    match *op {
        Op::AddState { parent } => {
            let parent = pick(&containers(ctx), parent);
            let state = ctx.new_item(State::new("s", 0.0, 0.0));
            ctx.add_item(state, parent).unwrap();
        }
        Op::AddPseudostate { kind, parent } => {
            let parent = pick(&containers(ctx), parent);
            let pseudo = ctx.new_item(Item::pseudostate(pseudostate_kind(kind), 0.0, 0.0));
            ctx.add_item(pseudo, parent).unwrap();
        }
        Op::AddTransition { src, dst } => {
            let states = states(ctx);
            if let (Some(src), Some(dst)) = (pick(&states, src), pick(&states, dst)) {
                let t = ctx.new_item(Transition::new(src, dst));
                ctx.add_item(t, None).unwrap();
            }
        }
        Op::Delete { item } => {
            let mut candidates = states(ctx);
            candidates.extend(transitions(ctx));
            if let Some(item) = pick(&candidates, item) {
                ctx.delete_item(item).unwrap();
                removed.push(item);
            }
        }
        Op::Retarget {
            transition,
            state,
            source_end,
        } => {
            let transitions = transitions(ctx);
            let states = states(ctx);
            if let (Some(t), Some(state)) = (pick(&transitions, transition), pick(&states, state)) {
                let attr = if source_end { Attr::SrcId } else { Attr::DstId };
                ctx.set_attr(t, attr, AttrValue::reference(state)).unwrap();
            }
        }
        Op::Move {
            item,
            parent,
            region,
        } => {
            let candidates = if region { regions(ctx) } else { states(ctx) };
            let containers = containers(ctx);
            if let (Some(item), Some(parent)) = (pick(&candidates, item), pick(&containers, parent)) {
                let before = ctx.to_json().unwrap();
                let placed = ctx.add_item(item, Some(parent));
                if !matches!(placed, Ok(Some(_))) {
                    prop_assert_eq!(&before, &ctx.to_json().unwrap(), "{:?} changed the chart", placed);
                    check_index_matches_rebuild(ctx)?;
                }
            }
        }
        Op::Restore { item } => {
            if let Some(item) = pick(removed, item) {
                if ctx.parent(item).is_none() {
                    ctx.add_item(item, None).unwrap();
                }
            }
        }
    }
    Ok(())
}

fn build(ops: &[Op]) -> Result<(ChartContext, Vec<ItemId>), TestCaseError> {
    let mut ctx = ChartContext::new(Document::new(), Config::default());
    let mut removed = Vec::new();
    for op in ops {
        apply(&mut ctx, op, &mut removed)?;
    }
    Ok((ctx, removed))
}

fn as_set(ids: &[ItemId]) -> BTreeSet<ItemId> {
    ids.iter().copied().collect()
}

fn check_index_matches_rebuild(ctx: &ChartContext) -> Result<(), TestCaseError> {
    let doc = ctx.document();
    let rebuilt = GraphIndex::new(doc);
    prop_assert_eq!(ctx.index().states(), rebuilt.states());
    prop_assert_eq!(ctx.index().statecharts(), rebuilt.statecharts());
    prop_assert_eq!(ctx.index().transitions(), rebuilt.transitions());
    for &state in rebuilt.states() {
        prop_assert_eq!(
            as_set(ctx.in_transitions(state).unwrap()),
            as_set(rebuilt.in_transitions(doc, state).unwrap())
        );
        prop_assert_eq!(
            as_set(ctx.out_transitions(state).unwrap()),
            as_set(rebuilt.out_transitions(doc, state).unwrap())
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_incremental_index_matches_rebuild(ops in arb_ops()) {
        let (ctx, _) = build(&ops)?;
        check_index_matches_rebuild(&ctx)?;
    }

    #[test]
    fn test_subgraph_partition_is_total(
        ops in arb_ops(),
        picks in prop::collection::vec(any::<usize>(), 0..6)
    ) {
        let (ctx, _) = build(&ops)?;
        let candidates = containers(&ctx);
        let items: Vec<ItemId> = picks.iter().filter_map(|&n| pick(&candidates, n)).collect();
        let info = ctx.subgraph_info(&items);

        let union: BTreeSet<ItemId> = info
            .interior_transitions
            .iter()
            .chain(&info.in_transitions)
            .chain(&info.out_transitions)
            .copied()
            .collect();
        prop_assert_eq!(&union, &info.transitions);
        prop_assert!(info.interior_transitions.is_disjoint(&info.in_transitions));
        prop_assert!(info.interior_transitions.is_disjoint(&info.out_transitions));
        prop_assert!(info.in_transitions.is_disjoint(&info.out_transitions));

        // Self-loops inside the set are interior.
        for &t in &info.transitions {
            let (src, dst) = ctx.index().endpoints(t);
            if src.is_some() && src == dst {
                prop_assert!(info.interior_transitions.contains(&t));
            }
        }
    }

    #[test]
    fn test_make_consistent_is_idempotent(ops in arb_ops()) {
        let (mut ctx, _) = build(&ops)?;
        ctx.make_consistent().unwrap();
        let once = ctx.to_json().unwrap();

        let report = ctx.make_consistent().unwrap();
        prop_assert!(report.is_empty(), "second repair changed {:?}", report);
        prop_assert_eq!(once, ctx.to_json().unwrap());
        check_index_matches_rebuild(&ctx)?;
    }

    #[test]
    fn test_no_dangling_transitions_after_repair(ops in arb_ops()) {
        let (mut ctx, _) = build(&ops)?;
        ctx.make_consistent().unwrap();

        let doc = ctx.document();
        for &t in ctx.index().transitions() {
            let src = doc.resolve_src(t);
            let dst = doc.resolve_dst(t);
            prop_assert!(src.is_some_and(|s| ctx.index().is_tracked_state(s)));
            prop_assert!(dst.is_some_and(|d| ctx.index().is_tracked_state(d)));
        }
    }

    #[test]
    fn test_cancel_restores_document(before in arb_ops(), during in arb_ops()) {
        let (mut ctx, mut removed) = build(&before)?;
        let snapshot = ctx.to_json().unwrap();

        ctx.begin_transaction("random edits").unwrap();
        for op in &during {
            apply(&mut ctx, op, &mut removed)?;
        }
        ctx.cancel_transaction().unwrap();

        prop_assert_eq!(snapshot, ctx.to_json().unwrap());
        check_index_matches_rebuild(&ctx)?;
    }
}
