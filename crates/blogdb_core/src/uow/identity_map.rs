//! Identity map: one in-memory instance per stored row.
//!
//! # Invariants
//! - Two lookups of the same `(kind, key)` return the same `Rc` until `clear`.
//! - Only the owning `UnitOfWork` registers, removes or clears entries.
//! - Iteration follows registration order.

use crate::model::{AnyEntity, Entity, EntityId, EntityKind, EntityRef};
use std::collections::HashMap;

type Key = (EntityKind, EntityId);

#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<Key, AnyEntity>,
    order: Vec<Key>,
}

impl IdentityMap {
    /// Cached instance of `T` with primary key `key`.
    pub fn get<T: Entity>(&self, key: EntityId) -> Option<EntityRef<T>> {
        self.entries
            .get(&(T::KIND, key))
            .and_then(|entity| T::from_any(entity))
    }

    pub fn get_any(&self, kind: EntityKind, key: EntityId) -> Option<&AnyEntity> {
        self.entries.get(&(kind, key))
    }

    pub fn contains(&self, kind: EntityKind, key: EntityId) -> bool {
        self.entries.contains_key(&(kind, key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Managed entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &AnyEntity> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// Registers `entity` under its kind and `key`, returning a replaced instance.
    pub(crate) fn register(&mut self, key: EntityId, entity: AnyEntity) -> Option<AnyEntity> {
        let map_key = (entity.kind(), key);
        let previous = self.entries.insert(map_key, entity);
        if previous.is_none() {
            self.order.push(map_key);
        }
        previous
    }

    pub(crate) fn remove(&mut self, kind: EntityKind, key: EntityId) -> Option<AnyEntity> {
        let removed = self.entries.remove(&(kind, key));
        if removed.is_some() {
            self.order.retain(|entry| *entry != (kind, key));
        }
        removed
    }

    /// Empties the map and hands back the evicted entities in registration order.
    pub(crate) fn clear(&mut self) -> Vec<AnyEntity> {
        let mut entries = std::mem::take(&mut self.entries);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|key| entries.remove(&key))
            .collect()
    }
}
