//! Validate command implementation.

use std::path::Path;

use anyhow::Result;
use statechart_ops::{violations, Config};
use tracing::info;

/// Check the root statechart of a document. Returns whether it is valid.
pub fn execute(config: &Config, path: &Path, json: bool) -> Result<bool> {
    let ctx = super::open(config, path)?;
    let found = violations(ctx.document(), ctx.root());
    info!(violations = found.len(), "validated document");

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else if found.is_empty() {
        println!("✅ {} is a valid statechart", path.display());
    } else {
        println!("❌ {} has {} violation(s):", path.display(), found.len());
        for violation in &found {
            println!("   • {}", violation);
        }
    }

    Ok(found.is_empty())
}
