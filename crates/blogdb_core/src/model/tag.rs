//! Tag entity.

use crate::error::{OrmError, OrmResult};
use crate::model::meta::{Columns, EntityMeta};
use crate::model::schema::{Constraint, EntitySchema, FieldSchema, RelationKind, RelationSchema};
use crate::model::{AnyEntity, Entity, EntityId, EntityKind, EntityRef, Post};
use crate::relation::reference::RelationLink;
use crate::relation::Collection;
use crate::store::{Row, Store};
use crate::uow::UnitOfWork;
use rusqlite::types::Value;

pub static TAG_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Tag,
    fields: &[FieldSchema {
        name: "name",
        column: "name",
        constraints: &[
            Constraint::Required,
            Constraint::MinLength(3),
            Constraint::MaxLength(16),
        ],
    }],
    relations: &[RelationSchema {
        name: "posts",
        target: EntityKind::Post,
        kind: RelationKind::ManyToMany {
            pivot: EntityKind::PostTag,
            owner_column: "tag_id",
            target_column: "post_id",
        },
    }],
};

#[derive(Debug, Default)]
pub struct Tag {
    meta: EntityMeta,
    id: Option<EntityId>,
    pub name: String,
    posts: Collection<Post>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Posts carrying this tag; load with `UnitOfWork::load_tag_posts`.
    pub fn posts(&self) -> &Collection<Post> {
        &self.posts
    }

    pub(crate) fn posts_mut(&mut self) -> &mut Collection<Post> {
        &mut self.posts
    }
}

impl Entity for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    fn schema() -> &'static EntitySchema {
        &TAG_SCHEMA
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
            "name" => Some(self.name.as_str()),
            _ => None,
        }
    }

    fn link(&self, _relation: &str) -> Option<RelationLink> {
        None
    }

    fn columns(&self) -> Columns {
        vec![("name", Value::Text(self.name.clone()))]
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: Some(row.id()?),
            name: row.text("name")?,
            ..Self::default()
        })
    }

    fn refresh_from(&mut self, row: &Row) -> OrmResult<()> {
        self.name = row.text("name")?;
        Ok(())
    }

    fn into_any(this: EntityRef<Self>) -> AnyEntity {
        AnyEntity::Tag(this)
    }

    fn from_any(any: &AnyEntity) -> Option<EntityRef<Self>> {
        match any {
            AnyEntity::Tag(tag) => Some(tag.clone()),
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
            "posts" => uow.load_tag_posts(this).map(|_| ()),
            other => Err(OrmError::UnknownRelation {
                kind: Self::KIND,
                relation: other.to_string(),
            }),
        }
    }
}
