//! Relationship handles between entities.
//!
//! # Responsibility
//! - `Reference`: lazy many-to-one handle (`unset | uninitialized | initialized`).
//! - `foreign_key`: scalar key projection over a `Reference` slot.
//! - `Collection`: lazily loaded inverse side of a relation.
//!
//! # Invariants
//! - Reading a key never touches the store.
//! - Loads go through the owning unit of work's identity map.

pub mod collection;
pub mod foreign_key;
pub mod reference;

pub use collection::Collection;
pub use reference::{Reference, ReferenceOrigin, ReferenceState, RelationLink};
