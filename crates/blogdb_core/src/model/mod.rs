//! Entity model for the blog store.
//!
//! # Responsibility
//! - Define the four entities (`User`, `Post`, `Tag`, `PostTag`) and their schemas.
//! - Define the `Entity` contract consumed by the validator and the unit of work.
//! - Provide `AnyEntity`, the kind-tagged handle used by heterogeneous bookkeeping.
//!
//! # Invariants
//! - Entities are shared as `EntityRef<T>`; object identity is `Rc` pointer identity.
//! - Entities point at related rows only through `Reference` (strong, belongs-to)
//!   or `Collection` (weak, inverse side), so no strong reference cycle exists.
//! - Primary keys are `None` until the store assigns one on insert.

pub mod meta;
pub mod post;
pub mod post_tag;
pub mod schema;
pub mod tag;
pub mod user;

use crate::error::{OrmError, OrmResult, ValidationError};
use crate::relation::reference::RelationLink;
use crate::store::{Row, Store};
use crate::uow::UnitOfWork;
use crate::validation;
use meta::{Columns, EntityMeta, Session};
use schema::EntitySchema;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub use post::Post;
pub use post_tag::PostTag;
pub use tag::Tag;
pub use user::User;

/// Store-generated primary key.
pub type EntityId = i64;

/// Shared, identity-bearing handle to one in-memory entity.
pub type EntityRef<T> = Rc<RefCell<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Post,
    Tag,
    PostTag,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Post => "posts",
            Self::Tag => "tags",
            Self::PostTag => "post_tags",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Post => "post",
            Self::Tag => "tag",
            Self::PostTag => "post_tag",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Contract implemented by every persisted entity.
pub trait Entity: Sized + 'static {
    const KIND: EntityKind;

    fn schema() -> &'static EntitySchema;
    fn meta(&self) -> &EntityMeta;
    fn meta_mut(&mut self) -> &mut EntityMeta;
    fn id(&self) -> Option<EntityId>;
    fn set_id(&mut self, id: Option<EntityId>);

    /// Current value of a declared scalar field.
    fn field(&self, name: &str) -> Option<&str>;

    /// State of a declared belongs-to relation.
    fn link(&self, relation: &str) -> Option<RelationLink>;

    /// Column values written on insert/update, without `id`.
    fn columns(&self) -> Columns;

    /// Builds a detached instance from a stored row.
    fn from_row(row: &Row) -> OrmResult<Self>;

    /// Overwrites stored fields in place, keeping object identity.
    fn refresh_from(&mut self, row: &Row) -> OrmResult<()>;

    fn into_any(this: EntityRef<Self>) -> AnyEntity;
    fn from_any(any: &AnyEntity) -> Option<EntityRef<Self>>;

    /// Loads the named relation of `this` through `uow`.
    ///
    /// `refresh` forces re-reading rows that are already in the identity map.
    fn populate<S: Store>(
        this: &EntityRef<Self>,
        relation: &str,
        uow: &mut UnitOfWork<S>,
        refresh: bool,
    ) -> OrmResult<()> {
        let _ = (this, uow, refresh);
        Err(OrmError::UnknownRelation {
            kind: Self::KIND,
            relation: relation.to_string(),
        })
    }

    fn into_ref(self) -> EntityRef<Self> {
        Rc::new(RefCell::new(self))
    }

    /// Every violated field constraint, see `validation::errors`.
    fn errors(&self) -> Vec<String> {
        validation::errors(self)
    }

    fn is_valid(&self) -> bool {
        validation::is_valid(self)
    }

    fn is_attached(&self) -> bool {
        self.meta().is_attached()
    }
}

/// Kind-tagged entity handle.
#[derive(Debug, Clone)]
pub enum AnyEntity {
    User(EntityRef<User>),
    Post(EntityRef<Post>),
    Tag(EntityRef<Tag>),
    PostTag(EntityRef<PostTag>),
}

macro_rules! dispatch {
    ($value:expr, $handle:ident => $body:expr) => {
        match $value {
            AnyEntity::User($handle) => $body,
            AnyEntity::Post($handle) => $body,
            AnyEntity::Tag($handle) => $body,
            AnyEntity::PostTag($handle) => $body,
        }
    };
}

impl AnyEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Post(_) => EntityKind::Post,
            Self::Tag(_) => EntityKind::Tag,
            Self::PostTag(_) => EntityKind::PostTag,
        }
    }

    /// Address of the shared allocation; equal iff both handles are the same object.
    pub fn address(&self) -> usize {
        dispatch!(self, handle => Rc::as_ptr(handle) as *const () as usize)
    }

    pub fn same(&self, other: &AnyEntity) -> bool {
        self.address() == other.address()
    }

    pub fn id(&self) -> Option<EntityId> {
        dispatch!(self, handle => handle.borrow().id())
    }

    pub(crate) fn set_id(&self, id: Option<EntityId>) {
        dispatch!(self, handle => handle.borrow_mut().set_id(id))
    }

    pub(crate) fn columns(&self) -> Columns {
        dispatch!(self, handle => handle.borrow().columns())
    }

    /// True when columns differ from the last snapshot, or no snapshot exists.
    pub(crate) fn is_dirty(&self) -> bool {
        dispatch!(self, handle => {
            let entity = handle.borrow();
            entity
                .meta()
                .snapshot()
                .map_or(true, |snapshot| *snapshot != entity.columns())
        })
    }

    pub(crate) fn take_snapshot(&self) {
        dispatch!(self, handle => {
            let mut entity = handle.borrow_mut();
            let columns = entity.columns();
            entity.meta_mut().set_snapshot(columns);
        })
    }

    pub(crate) fn attach(&self, session: &Rc<Session>) {
        dispatch!(self, handle => handle.borrow_mut().meta_mut().attach(session))
    }

    pub(crate) fn detach(&self) {
        dispatch!(self, handle => handle.borrow_mut().meta_mut().detach())
    }

    pub(crate) fn gate(&self, scheduled: &dyn Fn(&AnyEntity) -> bool) -> Result<(), ValidationError> {
        dispatch!(self, handle => validation::gate(&*handle.borrow(), scheduled))
    }

    /// Initialized belongs-to targets, in declaration order.
    pub(crate) fn reference_targets(&self) -> Vec<AnyEntity> {
        dispatch!(self, handle => reference_targets(&*handle.borrow()))
    }
}

fn reference_targets<T: Entity>(entity: &T) -> Vec<AnyEntity> {
    T::schema()
        .belongs_to()
        .filter_map(|(name, _, _)| entity.link(name))
        .filter_map(|link| link.target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{AnyEntity, Entity, EntityKind, User};

    #[test]
    fn kind_maps_to_tables() {
        assert_eq!(EntityKind::User.table(), "users");
        assert_eq!(EntityKind::PostTag.table(), "post_tags");
        assert_eq!(EntityKind::PostTag.to_string(), "post_tag");
    }

    #[test]
    fn any_entity_identity_follows_rc_identity() {
        let alice = User::new("alice").into_ref();
        let same = User::into_any(alice.clone());
        let other = User::into_any(User::new("alice").into_ref());

        assert!(same.same(&AnyEntity::User(alice)));
        assert!(!same.same(&other));
    }

    #[test]
    fn new_entity_is_dirty_until_snapshotted() {
        let alice = User::into_any(User::new("alice").into_ref());
        assert!(alice.is_dirty());
        alice.take_snapshot();
        assert!(!alice.is_dirty());
    }
}
