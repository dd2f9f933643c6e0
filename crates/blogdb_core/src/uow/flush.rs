//! Flush: plan, validate, then write in one store transaction.
//!
//! # Responsibility
//! - Order pending entities so reference targets are inserted before dependents.
//! - Gate every insert/update before any write happens.
//! - Commit or roll back the whole plan as a unit.
//!
//! # Invariants
//! - A rejected flush performs zero store calls.
//! - A failed write rolls back and clears keys assigned by this flush; a
//!   transaction that never began is not rolled back.
//! - Pending set, removals and identity map change only after a commit.

use super::{UnitOfWork, UnitOfWorkState};
use crate::error::{OrmError, OrmResult, ValidationError};
use crate::model::AnyEntity;
use crate::store::{Filter, Store};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashSet;

/// Row counts written by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl FlushSummary {
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.deleted == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Insert,
    Update,
    Delete,
}

#[derive(Debug)]
struct Step {
    entity: AnyEntity,
    operation: Operation,
}

impl<S: Store> UnitOfWork<S> {
    /// Writes every pending change, see the module docs for ordering rules.
    pub fn flush(&mut self) -> OrmResult<FlushSummary> {
        let plan = self.plan();
        info!(
            "event=flush module=uow status=start uow={} steps={}",
            self.session.id(),
            plan.len()
        );

        self.state = UnitOfWorkState::Validating;
        if let Err(err) = validate(&plan) {
            self.state = UnitOfWorkState::Rejected;
            warn!(
                "event=flush module=uow status=rejected uow={} kind={} violations={}",
                self.session.id(),
                err.kind,
                err.details.len()
            );
            return Err(err.into());
        }

        if plan.is_empty() {
            self.state = UnitOfWorkState::Committed;
            return Ok(FlushSummary::default());
        }

        if let Err(err) = self.store.begin() {
            self.state = UnitOfWorkState::Rejected;
            error!(
                "event=flush module=uow status=error uow={} stage=begin error={}",
                self.session.id(),
                err
            );
            return Err(err.into());
        }

        let mut assigned = Vec::new();
        let summary = match self.write_and_commit(&plan, &mut assigned) {
            Ok(summary) => summary,
            Err(err) => {
                self.rollback_quietly();
                for entity in &assigned {
                    entity.set_id(None);
                }
                self.state = UnitOfWorkState::Rejected;
                error!(
                    "event=flush module=uow status=error uow={} error={}",
                    self.session.id(),
                    err
                );
                return Err(err);
            }
        };

        for step in plan {
            let Some(id) = step.entity.id() else {
                continue;
            };
            match step.operation {
                Operation::Insert | Operation::Update => {
                    step.entity.attach(&self.session);
                    step.entity.take_snapshot();
                    self.identity_map.register(id, step.entity);
                }
                Operation::Delete => {
                    self.identity_map.remove(step.entity.kind(), id);
                    step.entity.detach();
                }
            }
        }
        self.pending.clear();
        self.removals.clear();
        self.state = UnitOfWorkState::Committed;
        info!(
            "event=flush module=uow status=ok uow={} inserted={} updated={} deleted={}",
            self.session.id(),
            summary.inserted,
            summary.updated,
            summary.deleted
        );
        Ok(summary)
    }

    fn plan(&self) -> Vec<Step> {
        let mut seen: HashSet<usize> = self.removals.iter().map(AnyEntity::address).collect();
        let mut plan = Vec::new();

        for entity in &self.pending {
            schedule(entity, &mut seen, &mut plan);
        }
        for entity in self.identity_map.entities() {
            schedule(entity, &mut seen, &mut plan);
        }
        plan.extend(self.removals.iter().map(|entity| Step {
            entity: entity.clone(),
            operation: Operation::Delete,
        }));
        plan
    }

    fn write_and_commit(
        &mut self,
        plan: &[Step],
        assigned: &mut Vec<AnyEntity>,
    ) -> OrmResult<FlushSummary> {
        let summary = self.write(plan, assigned)?;
        self.store.commit()?;
        Ok(summary)
    }

    fn write(&mut self, plan: &[Step], assigned: &mut Vec<AnyEntity>) -> OrmResult<FlushSummary> {
        let mut summary = FlushSummary::default();
        for step in plan {
            let kind = step.entity.kind();
            match step.operation {
                Operation::Insert => {
                    let id = self.store.insert(kind, &step.entity.columns())?;
                    step.entity.set_id(Some(id));
                    assigned.push(step.entity.clone());
                    summary.inserted += 1;
                }
                Operation::Update => {
                    let id = step.entity.id().ok_or(OrmError::NotFound { kind, key: None })?;
                    if self.store.update(kind, id, &step.entity.columns())? == 0 {
                        return Err(OrmError::NotFound {
                            kind,
                            key: Some(id),
                        });
                    }
                    summary.updated += 1;
                }
                Operation::Delete => {
                    let id = step.entity.id().ok_or(OrmError::NotFound { kind, key: None })?;
                    summary.deleted += self.store.delete(kind, &Filter::by_id(id))?;
                }
            }
        }
        Ok(summary)
    }
}

/// Appends `entity` after its keyless reference targets.
fn schedule(entity: &AnyEntity, seen: &mut HashSet<usize>, plan: &mut Vec<Step>) {
    if !seen.insert(entity.address()) {
        return;
    }
    for target in entity.reference_targets() {
        if target.id().is_none() {
            schedule(&target, seen, plan);
        }
    }
    let operation = match entity.id() {
        None => Operation::Insert,
        Some(_) if entity.is_dirty() => Operation::Update,
        Some(_) => return,
    };
    plan.push(Step {
        entity: entity.clone(),
        operation,
    });
}

/// Gates inserts and updates in plan order; the first failing entity wins.
fn validate(plan: &[Step]) -> Result<(), ValidationError> {
    let mut inserted = HashSet::new();
    for step in plan {
        if step.operation == Operation::Delete {
            continue;
        }
        step.entity
            .gate(&|target: &AnyEntity| inserted.contains(&target.address()))?;
        if step.operation == Operation::Insert {
            inserted.insert(step.entity.address());
        }
    }
    Ok(())
}
