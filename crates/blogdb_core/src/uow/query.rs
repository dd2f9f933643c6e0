//! Read path: store rows merged through the identity map.
//!
//! # Invariants
//! - A row whose key is already mapped yields the mapped instance; it is only
//!   overwritten when a refresh is requested.
//! - Entities built from rows are attached and snapshotted before they are
//!   handed out, so unchanged loads never produce updates.

use super::UnitOfWork;
use crate::error::{OrmError, OrmResult};
use crate::model::{Entity, EntityId, EntityRef};
use crate::relation::Reference;
use crate::store::{Filter, Row, Store};
use log::debug;

/// Options for `find`/`find_one_with`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Relations loaded on every returned entity, in order.
    pub populate: Vec<&'static str>,
    /// Re-read rows already present in the identity map.
    pub refresh: bool,
}

impl FindOptions {
    pub fn populate(relations: &[&'static str]) -> Self {
        Self {
            populate: relations.to_vec(),
            refresh: false,
        }
    }

    pub fn with_refresh(mut self) -> Self {
        self.refresh = true;
        self
    }
}

impl<S: Store> UnitOfWork<S> {
    /// Mapped instance for `id`, else one fetched from the store.
    pub fn find_by_id<T: Entity>(&mut self, id: EntityId) -> OrmResult<Option<EntityRef<T>>> {
        if let Some(entity) = self.identity_map.get::<T>(id) {
            return Ok(Some(entity));
        }
        match self.store.find_one(T::KIND, &Filter::by_id(id))? {
            Some(row) => self.merge_row::<T>(&row, false).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_one<T: Entity>(&mut self, filter: &Filter) -> OrmResult<Option<EntityRef<T>>> {
        self.find_one_with(filter, &FindOptions::default())
    }

    pub fn find_one_with<T: Entity>(
        &mut self,
        filter: &Filter,
        options: &FindOptions,
    ) -> OrmResult<Option<EntityRef<T>>> {
        let Some(row) = self.store.find_one(T::KIND, filter)? else {
            return Ok(None);
        };
        let entity = self.merge_row::<T>(&row, options.refresh)?;
        for relation in &options.populate {
            T::populate(&entity, relation, self, options.refresh)?;
        }
        Ok(Some(entity))
    }

    /// Every entity of `T` matching `filter`, ordered by key.
    pub fn find<T: Entity>(
        &mut self,
        filter: &Filter,
        options: &FindOptions,
    ) -> OrmResult<Vec<EntityRef<T>>> {
        let rows = self.store.find(T::KIND, filter)?;
        let entities = rows
            .iter()
            .map(|row| self.merge_row::<T>(row, options.refresh))
            .collect::<OrmResult<Vec<_>>>()?;
        for entity in &entities {
            for relation in &options.populate {
                T::populate(entity, relation, self, options.refresh)?;
            }
        }
        debug!(
            "event=uow_find module=uow status=ok kind={} rows={} populate={}",
            T::KIND,
            entities.len(),
            options.populate.len()
        );
        Ok(entities)
    }

    pub fn count<T: Entity>(&self, filter: &Filter) -> OrmResult<u64> {
        Ok(self.store.count(T::KIND, filter)?)
    }

    /// Reference to `id` without I/O: initialized when the entity is mapped.
    pub fn get_reference<T: Entity>(&self, id: EntityId) -> Reference<T> {
        match self.identity_map.get::<T>(id) {
            Some(entity) => Reference::wrap(&entity),
            None => Reference::create(id),
        }
    }

    /// Loads `relation` on an entity already in hand.
    pub fn populate<T: Entity>(&mut self, entity: &EntityRef<T>, relation: &str) -> OrmResult<()> {
        T::populate(entity, relation, self, false)
    }

    /// Re-reads row `id` and returns the mapped instance holding its values.
    pub fn refresh<T: Entity>(&mut self, id: EntityId) -> OrmResult<EntityRef<T>> {
        let row = self
            .store
            .find_one(T::KIND, &Filter::by_id(id))?
            .ok_or(OrmError::NotFound {
                kind: T::KIND,
                key: Some(id),
            })?;
        self.merge_row::<T>(&row, true)
    }

    pub(crate) fn merge_row<T: Entity>(&mut self, row: &Row, refresh: bool) -> OrmResult<EntityRef<T>> {
        let id = row.id()?;
        if let Some(entity) = self.identity_map.get::<T>(id) {
            if refresh {
                entity.borrow_mut().refresh_from(row)?;
                T::into_any(entity.clone()).take_snapshot();
            }
            return Ok(entity);
        }

        let entity = T::from_row(row)?.into_ref();
        let any = T::into_any(entity.clone());
        any.attach(&self.session);
        any.take_snapshot();
        self.identity_map.register(id, any);
        Ok(entity)
    }
}
