//! Repair command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use statechart_ops::{Config, RepairReport};

/// Run the repair pass and write the result to `output`, or stdout.
///
/// The report goes to stderr so stdout stays a valid document.
pub fn execute(config: &Config, path: &Path, output: Option<&Path>, quiet: bool) -> Result<RepairReport> {
    let mut ctx = super::open(config, path)?;
    let report = ctx.make_consistent()?;
    let json = ctx.to_json()?;

    match output {
        Some(output_path) => {
            std::fs::write(output_path, &json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
        }
        None => println!("{}", json),
    }

    if !quiet {
        print_report(&report);
        if !ctx.is_valid_statechart(ctx.root()) {
            eprintln!("⚠️  The repaired statechart is still invalid; run `sc validate` for details");
        }
    }

    Ok(report)
}

fn print_report(report: &RepairReport) {
    if report.is_empty() {
        eprintln!("✅ Nothing to repair");
        return;
    }

    let list = |ids: &[statechart_core::ItemId]| {
        ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
    };
    eprintln!("🔧 Repaired:");
    if !report.deleted.is_empty() {
        eprintln!("   Deleted transitions:   {}", list(&report.deleted));
    }
    if !report.relocated.is_empty() {
        eprintln!("   Relocated transitions: {}", list(&report.relocated));
    }
    if !report.pruned.is_empty() {
        eprintln!("   Pruned regions:        {}", list(&report.pruned));
    }
}
