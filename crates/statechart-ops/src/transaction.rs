//! Transactions: group edits, repair on commit, roll back on cancel.
//!
//! Rollback replays the inverse of every recorded change through the normal
//! dispatch path, so the graph index and observers see the undo as ordinary
//! changes. There is no redo history.

use serde::Serialize;
use statechart_core::{ChangeEvent, ItemId};
use tracing::{debug, info, warn};

use crate::context::ChartContext;
use crate::editing::RepairReport;
use crate::error::{ModelError, ModelResult};
use crate::validity;

/// An open transaction and the changes made inside it.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub name: String,
    events: Vec<ChangeEvent>,
}

impl Transaction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Changes made so far, in order.
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }
}

/// How [`ChartContext::finish_transaction`] closed a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Committed(RepairReport),
    Cancelled,
}

impl TransactionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TransactionOutcome::Committed(_))
    }
}

impl ChartContext {
    /// The open transaction, if any.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Open a transaction. Transactions do not nest.
    pub fn begin_transaction(&mut self, name: impl Into<String>) -> ModelResult<()> {
        if let Some(open) = &self.transaction {
            return Err(ModelError::TransactionInProgress {
                open: open.name.clone(),
            });
        }
        let transaction = Transaction::new(name);
        debug!(name = %transaction.name, "begin transaction");
        self.transaction = Some(transaction);
        Ok(())
    }

    /// Commit the open transaction, running the repair pass first when
    /// `repair_on_commit` is set.
    pub fn end_transaction(&mut self) -> ModelResult<RepairReport> {
        if self.transaction.is_none() {
            return Err(ModelError::NoTransaction);
        }
        let report = self.repair_if_configured()?;
        self.commit(&report);
        Ok(report)
    }

    fn repair_if_configured(&mut self) -> ModelResult<RepairReport> {
        if self.config.repair_on_commit {
            self.make_consistent()
        } else {
            Ok(RepairReport::default())
        }
    }

    /// Close the transaction and free whatever it left detached, unless the
    /// clipboard or selection still holds it.
    fn commit(&mut self, report: &RepairReport) {
        if let Some(transaction) = self.transaction.take() {
            let removed: Vec<ItemId> = transaction
                .events
                .iter()
                .filter_map(|event| match event {
                    ChangeEvent::Removed { item, .. } => Some(*item),
                    _ => None,
                })
                .collect();
            let keep: Vec<ItemId> = self
                .scrap
                .iter()
                .chain(self.selection.contents())
                .copied()
                .collect();
            self.doc.discard_detached(&removed, &keep);
            info!(
                name = %transaction.name,
                changes = transaction.events.len(),
                deleted = report.deleted.len(),
                relocated = report.relocated.len(),
                pruned = report.pruned.len(),
                "committed transaction"
            );
        }
    }

    /// Undo every change of the open transaction and close it.
    ///
    /// A step that can't be undone is skipped and the rest are still
    /// replayed; the first such failure is returned once the transaction is
    /// closed.
    pub fn cancel_transaction(&mut self) -> ModelResult<()> {
        let transaction = self.transaction.take().ok_or(ModelError::NoTransaction)?;
        let mut first_error = None;
        for event in transaction.events.iter().rev() {
            let inverse = match event {
                ChangeEvent::Inserted { parent, index, .. } => self.doc.remove(*parent, *index),
                ChangeEvent::Removed {
                    parent,
                    index,
                    item,
                } => self.doc.insert(*parent, *index, *item),
                ChangeEvent::Changed { item, attr, old } => {
                    self.doc.set_attr(*item, *attr, old.clone())
                }
            };
            match inverse {
                Ok(inverse) => self.apply(inverse),
                Err(err) => {
                    warn!(name = %transaction.name, error = %err, ?event, "could not undo change");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        info!(
            name = %transaction.name,
            changes = transaction.events.len(),
            "cancelled transaction"
        );
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Repair, validate the root statechart, then commit or cancel.
    pub fn finish_transaction(&mut self) -> ModelResult<TransactionOutcome> {
        let Some(name) = self.transaction.as_ref().map(|t| t.name.clone()) else {
            return Err(ModelError::NoTransaction);
        };
        let report = self.repair_if_configured()?;
        if self.config.validate_on_commit {
            let violations = validity::violations(&self.doc, self.doc.root());
            if !violations.is_empty() {
                warn!(
                    %name,
                    violations = violations.len(),
                    "statechart invalid, rolling back"
                );
                self.cancel_transaction()?;
                return Ok(TransactionOutcome::Cancelled);
            }
        }
        self.commit(&report);
        Ok(TransactionOutcome::Committed(report))
    }
}
