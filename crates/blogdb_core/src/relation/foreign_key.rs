//! Foreign-key projection over a `Reference` slot.
//!
//! # Invariants
//! - Reading returns `reference.key()` and never loads.
//! - Writing an equal key is a no-op, so a loaded target is never discarded.
//! - Writing a different key requires the owner to be attached to a live unit of
//!   work and always yields an uninitialized `ForeignKey` reference.

use crate::error::{OrmError, OrmResult};
use crate::model::meta::EntityMeta;
use crate::model::{Entity, EntityId, EntityKind};
use crate::relation::reference::Reference;

pub fn read<T: Entity>(reference: &Reference<T>) -> Option<EntityId> {
    reference.key()
}

/// Assigns `key` to the slot owned by an entity of `owner_kind`.
///
/// Returns `true` when the reference was replaced.
pub fn write<T: Entity>(
    owner_kind: EntityKind,
    owner: &EntityMeta,
    reference: &mut Reference<T>,
    key: Option<EntityId>,
) -> OrmResult<bool> {
    if reference.key() == key {
        return Ok(false);
    }
    if !owner.is_attached() {
        return Err(OrmError::Detached { kind: owner_kind });
    }

    *reference = match key {
        Some(key) => Reference::from_foreign_key(key),
        None => Reference::unset(),
    };
    Ok(true)
}
