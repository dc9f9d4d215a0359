//! Info command implementation.
//!
//! Summarizes the shape of a document: item counts plus a few facts about
//! the transition graph computed with petgraph.

use std::path::Path;

use anyhow::Result;
use petgraph::algo::{connected_components, is_cyclic_directed};
use serde::Serialize;
use statechart_ops::{ChartContext, Config};

/// Document summary printed by `sc info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartInfo {
    pub states: usize,
    pub pseudostates: usize,
    /// Statecharts below the root.
    pub regions: usize,
    pub transitions: usize,
    /// States and pseudostates directly in the root statechart.
    pub top_level_states: usize,
    /// Weakly connected components of the transition graph.
    pub connected_components: usize,
    pub has_cycles: bool,
    pub valid: bool,
}

impl ChartInfo {
    pub fn collect(ctx: &ChartContext) -> Self {
        let doc = ctx.document();
        let index = ctx.index();
        let kinds = move || index.states().iter().filter_map(move |&id| doc.kind(id));
        let (graph, _) = index.to_petgraph();

        Self {
            states: kinds().filter(|kind| kind.is_true_state()).count(),
            pseudostates: kinds().filter(|kind| kind.is_pseudostate()).count(),
            regions: index.statecharts().len().saturating_sub(1),
            transitions: index.transitions().len(),
            top_level_states: doc
                .children(ctx.root())
                .iter()
                .filter(|&&id| doc.kind(id).is_some_and(|kind| kind.is_state()))
                .count(),
            connected_components: connected_components(&graph),
            has_cycles: is_cyclic_directed(&graph),
            valid: ctx.is_valid_statechart(ctx.root()),
        }
    }
}

/// Print the summary of the document at `path`.
pub fn execute(config: &Config, path: &Path, json: bool) -> Result<ChartInfo> {
    let ctx = super::open(config, path)?;
    let info = ChartInfo::collect(&ctx);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(info);
    }

    println!("📊 Statechart Info: {}", path.display());
    println!("{:─<50}", "");
    println!();
    println!("🔵 States:           {}", info.states);
    println!("⚪ Pseudostates:     {}", info.pseudostates);
    println!("🗂️  Regions:          {}", info.regions);
    println!("➡️  Transitions:      {}", info.transitions);
    println!("🔝 Top-level states: {}", info.top_level_states);
    println!();
    println!("🧩 Components:       {}", info.connected_components);
    println!("🔁 Cycles:           {}", if info.has_cycles { "yes" } else { "no" });
    println!("✅ Valid:            {}", if info.valid { "yes" } else { "no" });

    Ok(info)
}
