//! User entity.

use crate::error::{OrmError, OrmResult};
use crate::model::meta::{Columns, EntityMeta};
use crate::model::schema::{Constraint, EntitySchema, FieldSchema, RelationKind, RelationSchema};
use crate::model::{AnyEntity, Entity, EntityId, EntityKind, EntityRef, Post};
use crate::relation::reference::RelationLink;
use crate::relation::Collection;
use crate::store::{Row, Store};
use crate::uow::UnitOfWork;
use rusqlite::types::Value;

pub static USER_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::User,
    fields: &[FieldSchema {
        name: "username",
        column: "username",
        constraints: &[
            Constraint::Required,
            Constraint::MinLength(3),
            Constraint::MaxLength(24),
        ],
    }],
    relations: &[RelationSchema {
        name: "posts",
        target: EntityKind::Post,
        kind: RelationKind::HasMany {
            mapped_by: "author_id",
        },
    }],
};

/// Author account; `username` is unique in the store.
#[derive(Debug, Default)]
pub struct User {
    meta: EntityMeta,
    id: Option<EntityId>,
    pub username: String,
    posts: Collection<Post>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Posts authored by this user; load with `UnitOfWork::load_posts`.
    pub fn posts(&self) -> &Collection<Post> {
        &self.posts
    }

    pub(crate) fn posts_mut(&mut self) -> &mut Collection<Post> {
        &mut self.posts
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn schema() -> &'static EntitySchema {
        &USER_SCHEMA
    }

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: Option<EntityId>) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(self.username.as_str()),
            _ => None,
        }
    }

    fn link(&self, _relation: &str) -> Option<RelationLink> {
        None
    }

    fn columns(&self) -> Columns {
        vec![("username", Value::Text(self.username.clone()))]
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: Some(row.id()?),
            username: row.text("username")?,
            ..Self::default()
        })
    }

    fn refresh_from(&mut self, row: &Row) -> OrmResult<()> {
        self.username = row.text("username")?;
        Ok(())
    }

    fn into_any(this: EntityRef<Self>) -> AnyEntity {
        AnyEntity::User(this)
    }

    fn from_any(any: &AnyEntity) -> Option<EntityRef<Self>> {
        match any {
            AnyEntity::User(user) => Some(user.clone()),
            _ => None,
        }
    }

    fn populate<S: Store>(
        this: &EntityRef<Self>,
        relation: &str,
        uow: &mut UnitOfWork<S>,
        _refresh: bool,
    ) -> OrmResult<()> {
        match relation {
            "posts" => uow.load_posts(this).map(|_| ()),
            other => Err(OrmError::UnknownRelation {
                kind: Self::KIND,
                relation: other.to_string(),
            }),
        }
    }
}
