//! Lazily loaded, order-irrelevant set of related entities.
//!
//! Members are held weakly; the identity map or pending set of the unit of work
//! owns them. A collection is stale once any member has been dropped, which
//! happens after `UnitOfWork::clear` releases its handles.

use crate::error::{OrmError, OrmResult};
use crate::model::{Entity, EntityRef};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

pub struct Collection<T> {
    loaded: Option<Vec<Weak<RefCell<T>>>>,
    added: Vec<Weak<RefCell<T>>>,
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self {
            loaded: None,
            added: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    /// Loaded members; `NotLoaded` before the first load or once stale.
    pub fn items(&self) -> OrmResult<Vec<EntityRef<T>>> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or(OrmError::NotLoaded { kind: T::KIND })?;
        loaded
            .iter()
            .map(|member| member.upgrade().ok_or(OrmError::NotLoaded { kind: T::KIND }))
            .collect()
    }

    /// Member count once loaded.
    pub fn len(&self) -> Option<usize> {
        self.loaded.as_ref().map(Vec::len)
    }

    pub fn contains(&self, entity: &EntityRef<T>) -> bool {
        let target = Rc::downgrade(entity);
        self.loaded
            .iter()
            .flatten()
            .chain(self.added.iter())
            .any(|member| member.ptr_eq(&target))
    }

    /// Replaces the loaded members, keeping additions not yet seen in the store.
    pub(crate) fn hydrate(&mut self, members: &[EntityRef<T>]) {
        let mut loaded: Vec<Weak<RefCell<T>>> = members.iter().map(Rc::downgrade).collect();
        for added in self.added.drain(..) {
            if added.strong_count() > 0 && !loaded.iter().any(|member| member.ptr_eq(&added)) {
                loaded.push(added);
            }
        }
        self.loaded = Some(loaded);
    }

    /// Adds a member; returns `false` if it was already present.
    pub(crate) fn add(&mut self, entity: &EntityRef<T>) -> bool {
        if self.contains(entity) {
            return false;
        }
        let member = Rc::downgrade(entity);
        match self.loaded.as_mut() {
            Some(loaded) => loaded.push(member),
            None => self.added.push(member),
        }
        true
    }
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Debug for Collection<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &T::KIND)
            .field("loaded", &self.len())
            .field("added", &self.added.len())
            .finish()
    }
}
