//! Lazy many-to-one reference.
//!
//! # Responsibility
//! - Hold either nothing, a bare key, or a loaded entity for one belongs-to slot.
//! - Load or refresh the target on demand through a `UnitOfWork`.
//!
//! # Invariants
//! - `key()` is O(1) and never performs I/O.
//! - `load()` on an initialized reference issues zero store calls.
//! - A reference produced by a foreign-key write carries `ReferenceOrigin::ForeignKey`
//!   until it is explicitly refreshed.

use crate::error::{OrmError, OrmResult};
use crate::model::{AnyEntity, Entity, EntityId, EntityRef};
use crate::store::Store;
use crate::uow::UnitOfWork;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceState {
    Unset,
    /// Only the key is known.
    Uninitialized,
    /// The related entity is in hand.
    Initialized,
}

/// How the current reference value was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOrigin {
    /// `create`, `wrap`, or decoded from a stored row.
    Explicit,
    /// Built from a bare key assignment; consumers needing non-key fields must
    /// `refresh` instead of trusting a cached instance.
    ForeignKey,
}

/// Non-generic view of a reference slot, used by the validation gate and cascade.
#[derive(Debug, Clone)]
pub struct RelationLink {
    pub state: ReferenceState,
    pub key: Option<EntityId>,
    pub(crate) target: Option<AnyEntity>,
}

enum Slot<T> {
    Unset,
    Uninitialized(EntityId),
    Initialized(EntityRef<T>),
}

/// Lazy handle to a related entity of type `T`.
pub struct Reference<T> {
    slot: Slot<T>,
    origin: ReferenceOrigin,
}

impl<T: Entity> Reference<T> {
    pub fn unset() -> Self {
        Self {
            slot: Slot::Unset,
            origin: ReferenceOrigin::Explicit,
        }
    }

    /// Uninitialized reference to `key`; does not touch the store.
    pub fn create(key: EntityId) -> Self {
        Self {
            slot: Slot::Uninitialized(key),
            origin: ReferenceOrigin::Explicit,
        }
    }

    /// Initialized reference to an entity already in hand.
    pub fn wrap(entity: &EntityRef<T>) -> Self {
        Self {
            slot: Slot::Initialized(Rc::clone(entity)),
            origin: ReferenceOrigin::Explicit,
        }
    }

    pub(crate) fn from_foreign_key(key: EntityId) -> Self {
        Self {
            slot: Slot::Uninitialized(key),
            origin: ReferenceOrigin::ForeignKey,
        }
    }

    pub fn state(&self) -> ReferenceState {
        match self.slot {
            Slot::Unset => ReferenceState::Unset,
            Slot::Uninitialized(_) => ReferenceState::Uninitialized,
            Slot::Initialized(_) => ReferenceState::Initialized,
        }
    }

    pub fn origin(&self) -> ReferenceOrigin {
        self.origin
    }

    pub fn is_from_foreign_key(&self) -> bool {
        self.origin == ReferenceOrigin::ForeignKey
    }

    pub fn is_set(&self) -> bool {
        !matches!(self.slot, Slot::Unset)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.slot, Slot::Initialized(_))
    }

    /// Key of the target without loading it.
    ///
    /// For an initialized reference this is the wrapped entity's key, which is
    /// `None` until that entity is inserted.
    pub fn key(&self) -> Option<EntityId> {
        match &self.slot {
            Slot::Unset => None,
            Slot::Uninitialized(key) => Some(*key),
            Slot::Initialized(entity) => entity.borrow().id(),
        }
    }

    /// The wrapped entity; fails with `NotLoaded` when only the key is known.
    pub fn entity(&self) -> OrmResult<EntityRef<T>> {
        match &self.slot {
            Slot::Initialized(entity) => Ok(Rc::clone(entity)),
            Slot::Uninitialized(_) => Err(OrmError::NotLoaded { kind: T::KIND }),
            Slot::Unset => Err(OrmError::NotFound {
                kind: T::KIND,
                key: None,
            }),
        }
    }

    /// Returns whether this reference wraps exactly `entity`.
    pub fn points_to(&self, entity: &EntityRef<T>) -> bool {
        matches!(&self.slot, Slot::Initialized(current) if Rc::ptr_eq(current, entity))
    }

    /// Resolves the target through the identity map, fetching it on a miss.
    pub fn load<S: Store>(&mut self, uow: &mut UnitOfWork<S>) -> OrmResult<EntityRef<T>> {
        let key = match &self.slot {
            Slot::Initialized(entity) => return Ok(Rc::clone(entity)),
            Slot::Uninitialized(key) => *key,
            Slot::Unset => {
                return Err(OrmError::NotFound {
                    kind: T::KIND,
                    key: None,
                })
            }
        };

        let entity = uow.find_by_id::<T>(key)?.ok_or(OrmError::NotFound {
            kind: T::KIND,
            key: Some(key),
        })?;
        self.slot = Slot::Initialized(Rc::clone(&entity));
        Ok(entity)
    }

    /// Re-reads the target row from the store and overwrites the identity-mapped
    /// instance in place.
    pub fn refresh<S: Store>(&mut self, uow: &mut UnitOfWork<S>) -> OrmResult<EntityRef<T>> {
        let key = self.key().ok_or(OrmError::NotFound {
            kind: T::KIND,
            key: None,
        })?;
        let entity = uow.refresh::<T>(key)?;
        self.slot = Slot::Initialized(Rc::clone(&entity));
        self.origin = ReferenceOrigin::Explicit;
        Ok(entity)
    }

    /// Populate step: refreshes when forced or when the reference came from a bare
    /// key assignment, otherwise loads through the identity map. Unset is a no-op.
    pub(crate) fn resolve<S: Store>(
        &mut self,
        uow: &mut UnitOfWork<S>,
        refresh: bool,
    ) -> OrmResult<()> {
        if !self.is_set() {
            return Ok(());
        }
        if refresh || self.is_from_foreign_key() {
            self.refresh(uow)?;
        } else {
            self.load(uow)?;
        }
        Ok(())
    }

    /// Aligns the slot with a key read from the store.
    ///
    /// An equal key keeps the current slot, including a loaded entity.
    pub(crate) fn sync_key(&mut self, key: Option<EntityId>) {
        if self.key() == key {
            return;
        }
        *self = match key {
            Some(key) => Self::create(key),
            None => Self::unset(),
        };
    }

    pub(crate) fn link(&self) -> RelationLink {
        RelationLink {
            state: self.state(),
            key: self.key(),
            target: match &self.slot {
                Slot::Initialized(entity) => Some(T::into_any(Rc::clone(entity))),
                _ => None,
            },
        }
    }
}

impl<T: Entity> Default for Reference<T> {
    fn default() -> Self {
        Self::unset()
    }
}

impl<T: Entity> Clone for Reference<T> {
    fn clone(&self) -> Self {
        let slot = match &self.slot {
            Slot::Unset => Slot::Unset,
            Slot::Uninitialized(key) => Slot::Uninitialized(*key),
            Slot::Initialized(entity) => Slot::Initialized(Rc::clone(entity)),
        };
        Self {
            slot,
            origin: self.origin,
        }
    }
}

impl<T: Entity> Debug for Reference<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Target omitted; references may form long chains.
        f.debug_struct("Reference")
            .field("kind", &T::KIND)
            .field("state", &self.state())
            .field("key", &self.key())
            .field("origin", &self.origin)
            .finish()
    }
}
