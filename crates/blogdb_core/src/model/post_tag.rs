//! Join row between `Post` and `Tag`.

use crate::error::{OrmError, OrmResult};
use crate::model::meta::{Columns, EntityMeta};
use crate::model::schema::{EntitySchema, RelationKind, RelationSchema};
use crate::model::{AnyEntity, Entity, EntityId, EntityKind, EntityRef, Post, Tag};
use crate::relation::reference::RelationLink;
use crate::relation::{foreign_key, Reference};
use crate::store::{Row, Store};
use crate::uow::UnitOfWork;
use rusqlite::types::Value;

pub static POST_TAG_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::PostTag,
    fields: &[],
    relations: &[
        RelationSchema {
            name: "post",
            target: EntityKind::Post,
            kind: RelationKind::BelongsTo {
                column: "post_id",
                required: true,
            },
        },
        RelationSchema {
            name: "tag",
            target: EntityKind::Tag,
            kind: RelationKind::BelongsTo {
                column: "tag_id",
                required: true,
            },
        },
    ],
};

#[derive(Debug, Default)]
pub struct PostTag {
    meta: EntityMeta,
    id: Option<EntityId>,
    post: Reference<Post>,
    tag: Reference<Tag>,
}

impl PostTag {
    pub fn new(post: Reference<Post>, tag: Reference<Tag>) -> Self {
        Self {
            post,
            tag,
            ..Self::default()
        }
    }

    /// Join row linking two entities already in hand.
    pub fn between(post: &EntityRef<Post>, tag: &EntityRef<Tag>) -> Self {
        Self::new(Reference::wrap(post), Reference::wrap(tag))
    }

    pub fn post(&self) -> &Reference<Post> {
        &self.post
    }

    pub fn post_mut(&mut self) -> &mut Reference<Post> {
        &mut self.post
    }

    pub fn set_post(&mut self, post: Reference<Post>) {
        self.post = post;
    }

    pub fn post_id(&self) -> Option<EntityId> {
        foreign_key::read(&self.post)
    }

    pub fn set_post_id(&mut self, post_id: Option<EntityId>) -> OrmResult<()> {
        foreign_key::write(Self::KIND, &self.meta, &mut self.post, post_id).map(|_| ())
    }

    pub fn tag(&self) -> &Reference<Tag> {
        &self.tag
    }

    pub fn tag_mut(&mut self) -> &mut Reference<Tag> {
        &mut self.tag
    }

    pub fn set_tag(&mut self, tag: Reference<Tag>) {
        self.tag = tag;
    }

    pub fn tag_id(&self) -> Option<EntityId> {
        foreign_key::read(&self.tag)
    }

    pub fn set_tag_id(&mut self, tag_id: Option<EntityId>) -> OrmResult<()> {
        foreign_key::write(Self::KIND, &self.meta, &mut self.tag, tag_id).map(|_| ())
    }
}

impl Entity for PostTag {
    const KIND: EntityKind = EntityKind::PostTag;

    fn schema() -> &'static EntitySchema {
        &POST_TAG_SCHEMA
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

    fn field(&self, _name: &str) -> Option<&str> {
        None
    }

    fn link(&self, relation: &str) -> Option<RelationLink> {
        match relation {
            "post" => Some(self.post.link()),
            "tag" => Some(self.tag.link()),
            _ => None,
        }
    }

    fn columns(&self) -> Columns {
        vec![
            ("post_id", self.post_id().map_or(Value::Null, Value::Integer)),
            ("tag_id", self.tag_id().map_or(Value::Null, Value::Integer)),
        ]
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        let mut link = Self {
            id: Some(row.id()?),
            ..Self::default()
        };
        link.refresh_from(row)?;
        Ok(link)
    }

    fn refresh_from(&mut self, row: &Row) -> OrmResult<()> {
        self.post.sync_key(row.optional_integer("post_id")?);
        self.tag.sync_key(row.optional_integer("tag_id")?);
        Ok(())
    }

    fn into_any(this: EntityRef<Self>) -> AnyEntity {
        AnyEntity::PostTag(this)
    }

    fn from_any(any: &AnyEntity) -> Option<EntityRef<Self>> {
        match any {
            AnyEntity::PostTag(link) => Some(link.clone()),
            _ => None,
        }
    }

    fn populate<S: Store>(
        this: &EntityRef<Self>,
        relation: &str,
        uow: &mut UnitOfWork<S>,
        refresh: bool,
    ) -> OrmResult<()> {
        let mut link = this.borrow_mut();
        match relation {
            "post" => link.post_mut().resolve(uow, refresh),
            "tag" => link.tag_mut().resolve(uow, refresh),
            other => Err(OrmError::UnknownRelation {
                kind: Self::KIND,
                relation: other.to_string(),
            }),
        }
    }
}
