mod common;

use blogdb_core::{
    Entity, EntityKind, Filter, FindOptions, FlushSummary, OrmError, Post, Reference, Tag,
    UnitOfWorkState, User,
};
use common::{counting_uow, rows, sqlite_uow};
use std::rc::Rc;

#[test]
fn state_follows_the_persist_flush_cycle() {
    let mut uow = sqlite_uow();
    assert_eq!(uow.state(), UnitOfWorkState::Idle);

    let alice = uow.create(User::new("alice")).unwrap();
    uow.persist(&alice).unwrap();
    assert_eq!(uow.state(), UnitOfWorkState::Collecting);
    assert_eq!(uow.pending_len(), 1);
    assert!(uow.is_pending(&alice));
    assert!(uow.is_managed(&alice));

    uow.flush().unwrap();
    assert_eq!(uow.state(), UnitOfWorkState::Committed);
    assert_eq!(uow.pending_len(), 0);

    uow.clear();
    assert_eq!(uow.state(), UnitOfWorkState::Idle);
    assert!(!uow.is_managed(&alice));
}

#[test]
fn references_are_inserted_before_dependents() {
    let mut uow = sqlite_uow();
    let alice = User::new("alice").into_ref();
    let mut post = Post::new("hello");
    post.set_author(Reference::wrap(&alice));
    let post = uow.create(post).unwrap();

    let summary = uow.flush().unwrap();

    assert_eq!(
        summary,
        FlushSummary {
            inserted: 2,
            updated: 0,
            deleted: 0
        }
    );
    let alice_id = alice.borrow().id().unwrap();
    assert_eq!(post.borrow().author_id(), Some(alice_id));
    assert!(alice.borrow().is_attached());
    assert!(uow.identity_map().contains(EntityKind::User, alice_id));
}

#[test]
fn changed_fields_are_written_on_the_next_flush() {
    let mut uow = sqlite_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    uow.flush().unwrap();
    let id = alice.borrow().id().unwrap();

    alice.borrow_mut().username = "alicia".to_string();
    let summary = uow.flush().unwrap();
    assert_eq!(summary.updated, 1);

    uow.clear();
    let stored = uow.find_by_id::<User>(id).unwrap().unwrap();
    assert_eq!(stored.borrow().username, "alicia");
}

#[test]
fn remove_deletes_and_detaches() {
    let mut uow = sqlite_uow();
    let tag = uow.create(Tag::new("rust")).unwrap();
    uow.flush().unwrap();
    let id = tag.borrow().id().unwrap();

    uow.remove(&tag);
    let summary = uow.flush().unwrap();

    assert_eq!(summary.deleted, 1);
    assert_eq!(rows(&uow, EntityKind::Tag), 0);
    assert!(!tag.borrow().is_attached());
    assert!(!uow.identity_map().contains(EntityKind::Tag, id));
}

#[test]
fn removing_an_unsaved_entity_only_unschedules_it() {
    let mut uow = sqlite_uow();
    let tag = uow.create(Tag::new("rust")).unwrap();
    uow.remove(&tag);

    assert_eq!(uow.pending_len(), 0);
    assert!(uow.flush().unwrap().is_empty());
    assert_eq!(rows(&uow, EntityKind::Tag), 0);
}

#[test]
fn foreign_key_rejection_rolls_back_the_whole_flush() {
    let mut uow = counting_uow();
    let tag = uow.create(Tag::new("rust")).unwrap();
    let post = uow.create(Post::new("hello")).unwrap();
    post.borrow_mut().set_author_id(Some(999)).unwrap();

    let err = uow.flush().unwrap_err();

    assert!(matches!(err, OrmError::Db(_)));
    assert_eq!(uow.state(), UnitOfWorkState::Rejected);
    assert_eq!(tag.borrow().id(), None);
    assert_eq!(post.borrow().id(), None);
    assert_eq!(uow.pending_len(), 2);
    assert!(uow.identity_map().is_empty());
    assert_eq!(rows(&uow, EntityKind::Tag), 0);
    assert_eq!(rows(&uow, EntityKind::Post), 0);
}

#[test]
fn purge_empties_every_table_and_the_identity_map() {
    let mut uow = sqlite_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    let post = uow.create(Post::new("hello")).unwrap();
    post.borrow_mut().set_author(Reference::wrap(&alice));
    let tag = uow.create(Tag::new("rust")).unwrap();
    uow.add_tag(&post, &tag).unwrap();
    uow.flush().unwrap();

    uow.purge().unwrap();

    for kind in [
        EntityKind::User,
        EntityKind::Post,
        EntityKind::Tag,
        EntityKind::PostTag,
    ] {
        assert_eq!(rows(&uow, kind), 0, "{kind} rows left");
    }
    assert!(uow.identity_map().is_empty());
    assert!(!alice.borrow().is_attached());
}

#[test]
fn user_posts_load_through_the_identity_map() {
    let mut uow = sqlite_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    let first = Post::new("first").into_ref();
    let second = Post::new("second").into_ref();
    uow.add_post(&alice, &first).unwrap();
    uow.add_post(&alice, &second).unwrap();
    assert!(alice.borrow().posts().contains(&first));
    uow.flush().unwrap();

    let posts = uow.load_posts(&alice).unwrap();
    assert_eq!(posts.len(), 2);
    assert!(Rc::ptr_eq(&posts[0], &first));
    assert!(Rc::ptr_eq(&posts[1], &second));
    assert_eq!(alice.borrow().posts().len(), Some(2));

    let id = alice.borrow().id().unwrap();
    uow.clear();

    let reloaded = uow.find_by_id::<User>(id).unwrap().unwrap();
    uow.populate(&reloaded, "posts").unwrap();
    let titles: Vec<String> = reloaded
        .borrow()
        .posts()
        .items()
        .unwrap()
        .iter()
        .map(|post| post.borrow().title.clone())
        .collect();
    assert_eq!(titles, vec!["first", "second"]);
}

#[test]
fn tags_link_through_join_rows() {
    let mut uow = sqlite_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    let mut post = Post::new("hello");
    post.set_author(Reference::wrap(&alice));
    let post = uow.create(post).unwrap();
    let rust = uow.create(Tag::new("rust")).unwrap();
    let orm = uow.create(Tag::new("orm")).unwrap();

    assert!(uow.add_tag(&post, &rust).unwrap().is_some());
    assert!(uow.add_tag(&post, &orm).unwrap().is_some());
    assert!(uow.add_tag(&post, &rust).unwrap().is_none());
    let summary = uow.flush().unwrap();
    assert_eq!(summary.inserted, 6);

    let post_id = post.borrow().id().unwrap();
    let rust_id = rust.borrow().id().unwrap();
    uow.clear();

    let post = uow
        .find_one_with::<Post>(&Filter::by_id(post_id), &FindOptions::populate(&["tags"]))
        .unwrap()
        .unwrap();
    let names: Vec<String> = post
        .borrow()
        .tags()
        .items()
        .unwrap()
        .iter()
        .map(|tag| tag.borrow().name.clone())
        .collect();
    assert_eq!(names, vec!["rust", "orm"]);

    let rust = uow.find_by_id::<Tag>(rust_id).unwrap().unwrap();
    let posts = uow.load_tag_posts(&rust).unwrap();
    assert_eq!(posts.len(), 1);
    assert!(Rc::ptr_eq(&posts[0], &post));

    assert!(uow.add_tag(&post, &rust).unwrap().is_none());
    assert_eq!(rows(&uow, EntityKind::PostTag), 2);
}

#[test]
fn repointing_a_managed_post_inserts_the_new_author_first() {
    let mut uow = sqlite_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    let post = uow.create(Post::new("hello")).unwrap();
    post.borrow_mut().set_author(Reference::wrap(&alice));
    uow.flush().unwrap();

    let bob = User::new("bob").into_ref();
    post.borrow_mut().set_author(Reference::wrap(&bob));
    let summary = uow.flush().unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 1);
    let bob_id = bob.borrow().id().unwrap();
    assert_eq!(post.borrow().author_id(), Some(bob_id));
    assert!(uow.identity_map().contains(EntityKind::User, bob_id));

    let post_id = post.borrow().id().unwrap();
    uow.clear();
    let stored = uow.find_by_id::<Post>(post_id).unwrap().unwrap();
    assert_eq!(stored.borrow().author_id(), Some(bob_id));
}

#[test]
fn failed_begin_does_not_roll_back() {
    let mut uow = counting_uow();
    let alice = uow.create(User::new("alice")).unwrap();
    uow.store_mut().refuse_begin();

    let err = uow.flush().unwrap_err();

    assert!(matches!(err, OrmError::Db(_)));
    assert_eq!(uow.state(), UnitOfWorkState::Rejected);
    assert_eq!(uow.store().rollbacks(), 0);
    assert_eq!(uow.store().writes(), 0);
    assert_eq!(alice.borrow().id(), None);
    assert_eq!(uow.pending_len(), 1);
}

#[test]
fn failed_write_rolls_back_once() {
    let mut uow = counting_uow();
    let post = uow.create(Post::new("hello")).unwrap();
    post.borrow_mut().set_author_id(Some(999)).unwrap();

    uow.flush().unwrap_err();

    assert_eq!(uow.store().rollbacks(), 1);
}
