//! Inverse-side collections: `User.posts`, `Post.tags` and `Tag.posts`.
//!
//! # Invariants
//! - Loading a collection merges rows through the identity map, so members are
//!   the same instances other queries return.
//! - A collection of an entity without a key loads as its pending additions only.

use super::UnitOfWork;
use crate::error::{OrmError, OrmResult};
use crate::model::schema::RelationKind;
use crate::model::{Entity, EntityKind, EntityRef, Post, PostTag, Tag, User};
use crate::relation::Reference;
use crate::store::{Filter, Store};

impl<S: Store> UnitOfWork<S> {
    /// Loads the posts authored by `user`.
    pub fn load_posts(&mut self, user: &EntityRef<User>) -> OrmResult<Vec<EntityRef<Post>>> {
        let owner_id = user.borrow().id();
        let posts = match owner_id {
            Some(id) => {
                let column = mapped_by(EntityKind::User, "posts")?;
                let rows = self.store.find(Post::KIND, &Filter::all().eq(column, id))?;
                rows.iter()
                    .map(|row| self.merge_row::<Post>(row, false))
                    .collect::<OrmResult<Vec<_>>>()?
            }
            None => Vec::new(),
        };
        let mut user = user.borrow_mut();
        user.posts_mut().hydrate(&posts);
        user.posts().items()
    }

    /// Makes `user` the author of `post` and persists the post.
    pub fn add_post(&mut self, user: &EntityRef<User>, post: &EntityRef<Post>) -> OrmResult<()> {
        self.persist(post)?;
        post.borrow_mut().set_author(Reference::wrap(user));
        user.borrow_mut().posts_mut().add(post);
        Ok(())
    }

    /// Loads the tags of `post` through its join rows.
    pub fn load_tags(&mut self, post: &EntityRef<Post>) -> OrmResult<Vec<EntityRef<Tag>>> {
        let owner_id = post.borrow().id();
        let tags = match owner_id {
            Some(id) => {
                let pivots = self.load_pivots(owner_column(EntityKind::Post, "tags")?, id)?;
                let mut tags = Vec::with_capacity(pivots.len());
                for pivot in pivots {
                    let tag = pivot.borrow_mut().tag_mut().load(self)?;
                    tags.push(tag);
                }
                tags
            }
            None => Vec::new(),
        };
        let mut post = post.borrow_mut();
        post.tags_mut().hydrate(&tags);
        post.tags().items()
    }

    /// Loads the posts carrying `tag`.
    pub fn load_tag_posts(&mut self, tag: &EntityRef<Tag>) -> OrmResult<Vec<EntityRef<Post>>> {
        let owner_id = tag.borrow().id();
        let posts = match owner_id {
            Some(id) => {
                let pivots = self.load_pivots(owner_column(EntityKind::Tag, "posts")?, id)?;
                let mut posts = Vec::with_capacity(pivots.len());
                for pivot in pivots {
                    let post = pivot.borrow_mut().post_mut().load(self)?;
                    posts.push(post);
                }
                posts
            }
            None => Vec::new(),
        };
        let mut tag = tag.borrow_mut();
        tag.posts_mut().hydrate(&posts);
        tag.posts().items()
    }

    /// Links `post` and `tag` through a new persisted join row.
    ///
    /// Returns `None` when they are already linked, in memory or in the store.
    pub fn add_tag(
        &mut self,
        post: &EntityRef<Post>,
        tag: &EntityRef<Tag>,
    ) -> OrmResult<Option<EntityRef<PostTag>>> {
        if post.borrow().tags().contains(tag) {
            return Ok(None);
        }
        let stored_link = (post.borrow().id(), tag.borrow().id());
        if let (Some(post_id), Some(tag_id)) = stored_link {
            let filter = Filter::all().eq("post_id", post_id).eq("tag_id", tag_id);
            if self.store.count(PostTag::KIND, &filter)? > 0 {
                return Ok(None);
            }
        }

        post.borrow_mut().tags_mut().add(tag);
        tag.borrow_mut().posts_mut().add(post);
        self.create(PostTag::between(post, tag)).map(Some)
    }

    fn load_pivots(
        &mut self,
        column: &'static str,
        owner_id: i64,
    ) -> OrmResult<Vec<EntityRef<PostTag>>> {
        let rows = self
            .store
            .find(PostTag::KIND, &Filter::all().eq(column, owner_id))?;
        rows.iter()
            .map(|row| self.merge_row::<PostTag>(row, false))
            .collect()
    }
}

fn mapped_by(kind: EntityKind, relation: &'static str) -> OrmResult<&'static str> {
    match relation_kind(kind, relation)? {
        RelationKind::HasMany { mapped_by } => Ok(mapped_by),
        _ => Err(unknown(kind, relation)),
    }
}

/// Join-table column pointing back at the owning side of `relation`.
fn owner_column(kind: EntityKind, relation: &'static str) -> OrmResult<&'static str> {
    match relation_kind(kind, relation)? {
        RelationKind::ManyToMany { owner_column, .. } => Ok(owner_column),
        _ => Err(unknown(kind, relation)),
    }
}

fn relation_kind(kind: EntityKind, relation: &'static str) -> OrmResult<RelationKind> {
    let schema = match kind {
        EntityKind::User => User::schema(),
        EntityKind::Post => Post::schema(),
        EntityKind::Tag => Tag::schema(),
        EntityKind::PostTag => PostTag::schema(),
    };
    schema
        .relation(relation)
        .map(|schema| schema.kind)
        .ok_or_else(|| unknown(kind, relation))
}

fn unknown(kind: EntityKind, relation: &str) -> OrmError {
    OrmError::UnknownRelation {
        kind,
        relation: relation.to_string(),
    }
}
