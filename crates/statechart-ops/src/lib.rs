//! Statechart Editing Layer
//!
//! This crate keeps a statechart document consistent while it is edited.
//!
//! ## Architecture
//!
//! - **GraphIndex**: incremental in/out transition lists for every state,
//!   plus subgraph classification (interior / incoming / outgoing)
//! - **Validity**: pure predicates for transitions and whole statecharts
//! - **ChartContext**: the open document with its index, selection,
//!   clipboard and transaction; all edits go through it
//!
//! ## Usage
//!
//! ```rust,no_run
//! use statechart_core::{Document, State, Transition};
//! use statechart_ops::{ChartContext, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut ctx = ChartContext::new(Document::new(), Config::load()?);
//!
//!     ctx.begin_transaction("add states")?;
//!     let a = ctx.new_item(State::new("A", 0.0, 0.0));
//!     let b = ctx.new_item(State::new("B", 200.0, 0.0));
//!     let t = ctx.new_item(Transition::new(a, b));
//!     ctx.add_items(&[a, b, t], None)?;
//!     let outcome = ctx.finish_transaction()?;
//!
//!     println!("committed: {}", outcome.is_committed());
//!     Ok(())
//! }
//! ```

mod clipboard;
mod config;
mod context;
mod editing;
mod error;
mod index;
mod selection;
mod transaction;
pub mod validity;

// Re-export public API
pub use config::Config;
pub use context::ChartContext;
pub use editing::RepairReport;
pub use error::{ModelError, ModelResult};
pub use index::{GraphIndex, GraphInfo};
pub use selection::Selection;
pub use transaction::{Transaction, TransactionOutcome};
pub use validity::{
    can_add_state, is_valid_statechart, is_valid_transition, is_valid_transition_item,
    violations, Violation,
};
