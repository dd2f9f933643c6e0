mod common;

use blogdb_core::{Entity, EntityKind, Filter, FindOptions, Post, User};
use common::{counting_uow, rows};
use std::rc::Rc;

#[test]
fn alice_writes_hello() {
    let mut uow = counting_uow();

    let alice = uow.create(User::new("alice")).unwrap();
    uow.flush().unwrap();
    assert_eq!(rows(&uow, EntityKind::User), 1);

    let found = uow
        .find_one::<User>(&Filter::all().eq("username", "alice"))
        .unwrap()
        .unwrap();
    assert!(Rc::ptr_eq(&found, &alice));
    assert_eq!(found.borrow().username, "alice");
    let alice_id = alice.borrow().id().unwrap();

    let post = uow.create(Post::new("hello")).unwrap();
    post.borrow_mut().set_author_id(Some(alice_id)).unwrap();
    uow.flush().unwrap();
    assert_eq!(rows(&uow, EntityKind::Post), 1);

    uow.clear();
    let post = uow
        .find_one_with::<Post>(
            &Filter::all().eq("author_id", alice_id),
            &FindOptions::populate(&["author"]),
        )
        .unwrap()
        .unwrap();

    let calls = uow.store().calls();
    let author = post.borrow_mut().author_mut().load(&mut uow).unwrap();
    assert_eq!(author.borrow().id(), Some(alice_id));
    assert_eq!(author.borrow().username, "alice");
    assert_eq!(post.borrow().title, "hello");
    assert_eq!(uow.store().calls(), calls);
}
