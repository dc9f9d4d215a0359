//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use statechart_ops::{ChartContext, Config};
use tracing::debug;

pub mod config;
pub mod info;
pub mod repair;
pub mod validate;

/// Read a document from disk and open it for editing.
pub fn open(config: &Config, path: &Path) -> Result<ChartContext> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let ctx = ChartContext::from_json(&json, config.clone())
        .with_context(|| format!("Failed to load statechart from {}", path.display()))?;
    debug!(path = %path.display(), items = ctx.document().len(), "opened document");
    Ok(ctx)
}
