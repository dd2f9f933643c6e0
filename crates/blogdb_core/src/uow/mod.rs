//! Unit of work: the explicit context for every store-touching operation.
//!
//! # Responsibility
//! - Own the `Store`, the identity map and the pending/removal sets.
//! - Attach entities on `persist`/load and detach them on `clear`.
//! - Run validation-gated flushes (see `flush`), queries (`query`) and
//!   collection operations (`relations`).
//!
//! # Invariants
//! - A unit of work is single-threaded (`Rc` handles make it `!Send`).
//! - Only this type writes to its identity map.
//! - A rejected flush leaves pending set, removals and identity map unchanged.

mod flush;
pub mod identity_map;
mod query;
mod relations;

use crate::error::{OrmError, OrmResult};
use crate::model::meta::Session;
use crate::model::{AnyEntity, Entity, EntityKind, EntityRef};
use crate::store::{Filter, Store};
use identity_map::IdentityMap;
use log::{debug, error, info, warn};
use std::rc::Rc;
use uuid::Uuid;

pub use flush::FlushSummary;
pub use query::FindOptions;

/// Position in the `persist → flush` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Nothing tracked since construction or the last `clear`.
    Idle,
    /// `persist`/`remove` calls are accumulating.
    Collecting,
    /// A flush is running its validation pass.
    Validating,
    /// The last flush wrote and committed its plan.
    Committed,
    /// The last flush was rejected by validation or the store.
    Rejected,
}

/// Tracks entities for one logical batch of changes against `S`.
pub struct UnitOfWork<S: Store> {
    store: S,
    session: Rc<Session>,
    identity_map: IdentityMap,
    pending: Vec<AnyEntity>,
    removals: Vec<AnyEntity>,
    state: UnitOfWorkState,
}

impl<S: Store> UnitOfWork<S> {
    pub fn new(store: S) -> Self {
        let session = Session::new();
        debug!("event=uow_open module=uow status=ok uow={}", session.id());
        Self {
            store,
            session,
            identity_map: IdentityMap::default(),
            pending: Vec::new(),
            removals: Vec::new(),
            state: UnitOfWorkState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.session.id()
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access; writes made here bypass validation and tracking.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn identity_map(&self) -> &IdentityMap {
        &self.identity_map
    }

    /// Number of entities explicitly persisted since the last successful flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending<T: Entity>(&self, entity: &EntityRef<T>) -> bool {
        let entity = T::into_any(Rc::clone(entity));
        self.pending.iter().any(|pending| pending.same(&entity))
    }

    /// Returns whether `entity` is managed by this unit of work.
    pub fn is_managed<T: Entity>(&self, entity: &EntityRef<T>) -> bool {
        entity.borrow().meta().session_id() == Some(self.session.id())
    }

    /// Schedules `entity` for insert (no key) or update (changed columns).
    ///
    /// Idempotent per instance. Attaches the entity, so key assignments on it
    /// become legal. A keyed entity is registered in the identity map.
    ///
    /// # Errors
    /// - `IdentityConflict` when the identity map already holds a different
    ///   instance for the same row (for example a copy re-fetched after `clear`).
    pub fn persist<T: Entity>(&mut self, entity: &EntityRef<T>) -> OrmResult<()> {
        let entity = T::into_any(Rc::clone(entity));
        if let Some(id) = entity.id() {
            let conflict = self
                .identity_map
                .get_any(T::KIND, id)
                .is_some_and(|mapped| !mapped.same(&entity));
            if conflict {
                warn!(
                    "event=uow_persist module=uow status=rejected uow={} kind={} id={} reason=identity_conflict",
                    self.session.id(),
                    T::KIND,
                    id
                );
                return Err(OrmError::IdentityConflict { kind: T::KIND, key: id });
            }
        }

        self.removals.retain(|removal| !removal.same(&entity));
        if !self.pending.iter().any(|pending| pending.same(&entity)) {
            self.pending.push(entity.clone());
        }
        entity.attach(&self.session);
        if let Some(id) = entity.id() {
            self.identity_map.register(id, entity.clone());
        }
        self.state = UnitOfWorkState::Collecting;
        debug!(
            "event=uow_persist module=uow status=ok uow={} kind={} pending={}",
            self.session.id(),
            entity.kind(),
            self.pending.len()
        );
        Ok(())
    }

    /// Wraps a fresh entity into a shared handle and persists it.
    pub fn create<T: Entity>(&mut self, entity: T) -> OrmResult<EntityRef<T>> {
        let entity = entity.into_ref();
        self.persist(&entity)?;
        Ok(entity)
    }

    /// Schedules deletion of a stored entity; an unsaved one is simply dropped
    /// from the pending set.
    pub fn remove<T: Entity>(&mut self, entity: &EntityRef<T>) {
        let entity = T::into_any(Rc::clone(entity));
        self.pending.retain(|pending| !pending.same(&entity));
        if entity.id().is_some() && !self.removals.iter().any(|removal| removal.same(&entity)) {
            self.removals.push(entity);
        }
        self.state = UnitOfWorkState::Collecting;
    }

    /// Empties the identity map and pending sets and detaches every entity
    /// handed out so far. Later lookups re-fetch new instances.
    pub fn clear(&mut self) {
        let evicted = self.identity_map.clear();
        self.session.bump_generation();
        self.pending.clear();
        self.removals.clear();
        self.state = UnitOfWorkState::Idle;
        info!(
            "event=uow_clear module=uow status=ok uow={} evicted={}",
            self.session.id(),
            evicted.len()
        );
    }

    /// Deletes every row of every entity table, children first, then `clear`s.
    pub fn purge(&mut self) -> OrmResult<()> {
        self.store.begin()?;
        for kind in [
            EntityKind::PostTag,
            EntityKind::Post,
            EntityKind::Tag,
            EntityKind::User,
        ] {
            if let Err(err) = self.store.delete(kind, &Filter::all()) {
                self.rollback_quietly();
                return Err(err.into());
            }
        }
        self.store.commit()?;
        self.clear();
        Ok(())
    }

    fn rollback_quietly(&mut self) {
        match self.store.rollback() {
            Ok(()) => warn!(
                "event=uow_rollback module=uow status=ok uow={}",
                self.session.id()
            ),
            Err(err) => error!(
                "event=uow_rollback module=uow status=error uow={} error={}",
                self.session.id(),
                err
            ),
        }
    }
}
