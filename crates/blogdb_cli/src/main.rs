//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the store described by `BLOGDB_*` environment variables.
//! - Run one author/post round trip and print deterministic counts.

use blogdb_core::{
    core_version, CoreConfig, Entity, Filter, FindOptions, OrmResult, Post, Store, UnitOfWork,
    User,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("blogdb: logging disabled: {err}");
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("blogdb: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CoreConfig) -> OrmResult<()> {
    let mut uow = UnitOfWork::new(config.open_store()?);
    info!("event=cli_run module=cli status=start uow={}", uow.id());

    let alice = match uow.find_one::<User>(&Filter::all().eq("username", "alice"))? {
        Some(alice) => alice,
        None => {
            let alice = uow.create(User::new("alice"))?;
            uow.flush()?;
            alice
        }
    };

    let post = uow.create(Post::new("hello"))?;
    post.borrow_mut().set_author_id(alice.borrow().id())?;
    uow.flush()?;
    uow.clear();

    let posts = uow.find::<Post>(&Filter::all(), &FindOptions::populate(&["author"]))?;
    let users = uow.store().count(User::KIND, &Filter::all())?;

    println!("blogdb_core version={}", core_version());
    println!("users={users} posts={}", posts.len());
    for post in &posts {
        let post = post.borrow();
        let author = post.author().entity()?;
        println!(
            "post id={} title={} author={}",
            post.id().unwrap_or_default(),
            post.title,
            author.borrow().username
        );
    }
    Ok(())
}
