mod common;

use blogdb_core::{
    Entity, EntityKind, Filter, OrmError, Post, PostTag, Reference, Store, Tag,
    UnitOfWorkState, User, ValidationError,
};
use common::{counting_uow, rows};
use rusqlite::types::Value;
use std::rc::Rc;

fn expect_validation(err: OrmError) -> ValidationError {
    match err {
        OrmError::Validation(err) => err,
        other => panic!("expected validation error, got: {other}"),
    }
}

#[test]
fn invalid_entity_blocks_every_write() {
    let mut uow = counting_uow();
    uow.create(User::new("al")).unwrap();

    let err = expect_validation(uow.flush().unwrap_err());

    assert_eq!(err.kind, EntityKind::User);
    assert_eq!(
        err.details,
        vec!["username must be longer than or equal to 3 characters".to_string()]
    );
    assert_eq!(uow.store().writes(), 0);
    assert_eq!(uow.state(), UnitOfWorkState::Rejected);
    assert_eq!(uow.pending_len(), 1);
    assert_eq!(rows(&uow, EntityKind::User), 0);
}

#[test]
fn post_without_author_is_rejected() {
    let mut uow = counting_uow();
    uow.create(Post::new("hello")).unwrap();

    let err = expect_validation(uow.flush().unwrap_err());

    assert_eq!(err.kind, EntityKind::Post);
    assert_eq!(err.details, vec!["author should not be empty".to_string()]);
    assert_eq!(rows(&uow, EntityKind::Post), 0);
}

#[test]
fn invalid_author_rejects_the_post_and_writes_neither() {
    let mut uow = counting_uow();
    let author = User::new("").into_ref();
    let mut post = Post::new("hello");
    post.set_author(Reference::wrap(&author));
    uow.create(post).unwrap();

    let err = expect_validation(uow.flush().unwrap_err());

    assert_eq!(err.kind, EntityKind::User);
    assert_eq!(
        err.to_string(),
        "validation errors: username should not be empty, \
         username must be longer than or equal to 3 characters"
    );
    assert_eq!(rows(&uow, EntityKind::User), 0);
    assert_eq!(rows(&uow, EntityKind::Post), 0);
    assert_eq!(author.borrow().id(), None);
}

#[test]
fn fixing_the_entity_lets_the_same_flush_succeed() {
    let mut uow = counting_uow();
    let user = uow.create(User::new("al")).unwrap();
    assert!(uow.flush().is_err());

    user.borrow_mut().username = "alice".to_string();
    let summary = uow.flush().unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(uow.state(), UnitOfWorkState::Committed);
    assert!(user.borrow().id().is_some());
}

#[test]
fn rejected_update_leaves_row_and_keeps_instance_until_clear() {
    let mut uow = counting_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    uow.flush().unwrap();
    let id = alice.borrow().id().unwrap();

    alice.borrow_mut().username = String::new();
    let err = expect_validation(uow.flush().unwrap_err());
    assert_eq!(err.details[0], "username should not be empty");

    let stored = uow
        .store()
        .find_one(EntityKind::User, &Filter::by_id(id))
        .unwrap()
        .unwrap();
    assert_eq!(stored.text("username").unwrap(), "alice");

    let cached = uow.find_by_id::<User>(id).unwrap().unwrap();
    assert!(Rc::ptr_eq(&cached, &alice));
    assert_eq!(cached.borrow().username, "");

    uow.clear();
    let reloaded = uow.find_by_id::<User>(id).unwrap().unwrap();
    assert_eq!(reloaded.borrow().username, "alice");
}

#[test]
fn reads_never_validate() {
    let mut uow = counting_uow();
    let id = uow
        .store_mut()
        .insert(EntityKind::User, &[("username", Value::Text("x".into()))])
        .unwrap();

    let user = uow.find_by_id::<User>(id).unwrap().unwrap();

    assert_eq!(user.borrow().username, "x");
    assert!(!user.borrow().is_valid());
    assert!(uow.flush().unwrap().is_empty());
}

#[test]
fn validation_error_serializes_kind_and_details() {
    let err = ValidationError::new(
        EntityKind::Post,
        vec!["title should not be empty".to_string()],
    );
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "kind": "post",
            "details": ["title should not be empty"],
        })
    );
}

#[test]
fn join_row_without_tag_is_rejected() {
    let mut uow = counting_uow();
    let author = uow.create(User::new("alice")).unwrap();
    let mut post = Post::new("hello");
    post.set_author(Reference::wrap(&author));
    let post = uow.create(post).unwrap();
    uow.flush().unwrap();

    uow.create(PostTag::new(Reference::wrap(&post), Reference::unset()))
        .unwrap();
    let writes = uow.store().writes();

    let err = expect_validation(uow.flush().unwrap_err());

    assert_eq!(err.kind, EntityKind::PostTag);
    assert_eq!(err.details, vec!["tag should not be empty".to_string()]);
    assert_eq!(uow.store().writes(), writes);
    assert_eq!(rows(&uow, EntityKind::PostTag), 0);
}

#[test]
fn invalid_keyless_tag_rejects_the_join_row() {
    let mut uow = counting_uow();
    let author = uow.create(User::new("alice")).unwrap();
    let mut post = Post::new("hello");
    post.set_author(Reference::wrap(&author));
    let post = uow.create(post).unwrap();
    let tag = Tag::new("").into_ref();
    uow.add_tag(&post, &tag).unwrap();

    let err = expect_validation(uow.flush().unwrap_err());

    assert_eq!(err.kind, EntityKind::Tag);
    assert_eq!(uow.store().writes(), 0);
    assert_eq!(rows(&uow, EntityKind::Tag), 0);
    assert_eq!(rows(&uow, EntityKind::PostTag), 0);
    assert_eq!(tag.borrow().id(), None);
}
