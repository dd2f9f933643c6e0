//! Post entity.
//!
//! # Invariants
//! - `author` is exposed both as a reference (`author`/`set_author`) and as a key
//!   (`author_id`/`set_author_id`); both read the same private slot.
//! - `author_id` is written to the `posts.author_id` column at flush time, after any
//!   newly created author has received its key.

use crate::error::{OrmError, OrmResult};
use crate::model::meta::{Columns, EntityMeta};
use crate::model::schema::{Constraint, EntitySchema, FieldSchema, RelationKind, RelationSchema};
use crate::model::{AnyEntity, Entity, EntityId, EntityKind, EntityRef, Tag, User};
use crate::relation::reference::RelationLink;
use crate::relation::{foreign_key, Collection, Reference};
use crate::store::{Row, Store};
use crate::uow::UnitOfWork;
use rusqlite::types::Value;

pub static POST_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Post,
    fields: &[FieldSchema {
        name: "title",
        column: "title",
        constraints: &[
            Constraint::Required,
            Constraint::MinLength(3),
            Constraint::MaxLength(64),
        ],
    }],
    relations: &[
        RelationSchema {
            name: "author",
            target: EntityKind::User,
            kind: RelationKind::BelongsTo {
                column: "author_id",
                required: true,
            },
        },
        RelationSchema {
            name: "tags",
            target: EntityKind::Tag,
            kind: RelationKind::ManyToMany {
                pivot: EntityKind::PostTag,
                owner_column: "post_id",
                target_column: "tag_id",
            },
        },
    ],
};

#[derive(Debug, Default)]
pub struct Post {
    meta: EntityMeta,
    id: Option<EntityId>,
    pub title: String,
    author: Reference<User>,
    tags: Collection<Tag>,
}

impl Post {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn author(&self) -> &Reference<User> {
        &self.author
    }

    /// Mutable access for `load`/`refresh`.
    pub fn author_mut(&mut self) -> &mut Reference<User> {
        &mut self.author
    }

    pub fn set_author(&mut self, author: Reference<User>) {
        self.author = author;
    }

    pub fn author_id(&self) -> Option<EntityId> {
        foreign_key::read(&self.author)
    }

    /// Points `author` at `author_id` without loading it.
    ///
    /// Fails with `Detached` unless this post is managed by a live unit of work;
    /// assigning the current key is a no-op.
    pub fn set_author_id(&mut self, author_id: Option<EntityId>) -> OrmResult<()> {
        foreign_key::write(Self::KIND, &self.meta, &mut self.author, author_id).map(|_| ())
    }

    /// Tags of this post; load with `UnitOfWork::load_tags`.
    pub fn tags(&self) -> &Collection<Tag> {
        &self.tags
    }

    pub(crate) fn tags_mut(&mut self) -> &mut Collection<Tag> {
        &mut self.tags
    }
}

impl Entity for Post {
    const KIND: EntityKind = EntityKind::Post;

    fn schema() -> &'static EntitySchema {
        &POST_SCHEMA
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
            "title" => Some(self.title.as_str()),
            _ => None,
        }
    }

    fn link(&self, relation: &str) -> Option<RelationLink> {
        match relation {
            "author" => Some(self.author.link()),
            _ => None,
        }
    }

    fn columns(&self) -> Columns {
        vec![
            ("title", Value::Text(self.title.clone())),
            ("author_id", self.author_id().map_or(Value::Null, Value::Integer)),
        ]
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        let mut post = Self {
            id: Some(row.id()?),
            title: row.text("title")?,
            ..Self::default()
        };
        post.author.sync_key(row.optional_integer("author_id")?);
        Ok(post)
    }

    fn refresh_from(&mut self, row: &Row) -> OrmResult<()> {
        self.title = row.text("title")?;
        self.author.sync_key(row.optional_integer("author_id")?);
        Ok(())
    }

    fn into_any(this: EntityRef<Self>) -> AnyEntity {
        AnyEntity::Post(this)
    }

    fn from_any(any: &AnyEntity) -> Option<EntityRef<Self>> {
        match any {
            AnyEntity::Post(post) => Some(post.clone()),
            _ => None,
        }
    }

    fn populate<S: Store>(
        this: &EntityRef<Self>,
        relation: &str,
        uow: &mut UnitOfWork<S>,
        refresh: bool,
    ) -> OrmResult<()> {
        match relation {
            "author" => this.borrow_mut().author_mut().resolve(uow, refresh),
            "tags" => uow.load_tags(this).map(|_| ()),
            other => Err(OrmError::UnknownRelation {
                kind: Self::KIND,
                relation: other.to_string(),
            }),
        }
    }
}
