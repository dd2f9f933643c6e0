//! Per-entity bookkeeping owned by the unit of work.
//!
//! # Responsibility
//! - Record which unit of work (and which of its generations) manages an entity.
//! - Hold the column snapshot used for change detection at flush time.
//!
//! # Invariants
//! - An entity is attached only while its session is alive and the session
//!   generation matches the one recorded at attach time.
//! - `UnitOfWork::clear` detaches every entity at once by bumping the generation.

use rusqlite::types::Value;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Column name/value pairs as written to the store.
pub type Columns = Vec<(&'static str, Value)>;

/// Liveness token shared by one unit of work and the entities it manages.
#[derive(Debug)]
pub(crate) struct Session {
    id: Uuid,
    generation: Cell<u64>,
}

impl Session {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            id: Uuid::new_v4(),
            generation: Cell::new(0),
        })
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Invalidates every attachment handed out so far.
    pub(crate) fn bump_generation(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }
}

#[derive(Debug, Clone)]
struct Attachment {
    session: Weak<Session>,
    generation: u64,
}

/// Lifecycle metadata embedded in every entity.
#[derive(Debug, Default)]
pub struct EntityMeta {
    attachment: Option<Attachment>,
    snapshot: Option<Columns>,
}

impl EntityMeta {
    /// Returns whether a live unit of work currently manages this entity.
    pub fn is_attached(&self) -> bool {
        self.live_session().is_some()
    }

    /// Id of the managing unit of work, if attached.
    pub fn session_id(&self) -> Option<Uuid> {
        self.live_session().map(|session| session.id())
    }

    pub(crate) fn attach(&mut self, session: &Rc<Session>) {
        self.attachment = Some(Attachment {
            session: Rc::downgrade(session),
            generation: session.generation(),
        });
    }

    pub(crate) fn detach(&mut self) {
        self.attachment = None;
        self.snapshot = None;
    }

    pub(crate) fn snapshot(&self) -> Option<&Columns> {
        self.snapshot.as_ref()
    }

    pub(crate) fn set_snapshot(&mut self, columns: Columns) {
        self.snapshot = Some(columns);
    }

    fn live_session(&self) -> Option<Rc<Session>> {
        let attachment = self.attachment.as_ref()?;
        let session = attachment.session.upgrade()?;
        (session.generation() == attachment.generation).then_some(session)
    }
}
