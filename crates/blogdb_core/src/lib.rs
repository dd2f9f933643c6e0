//! Blog store core: entities, lazy references and a validating unit of work
//! over SQLite.
//!
//! Every store-touching operation goes through an explicit `UnitOfWork`; there
//! is no process-wide session.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod relation;
pub mod store;
pub mod uow;
pub mod validation;

pub use config::CoreConfig;
pub use db::{DbError, DbResult};
pub use error::{OrmError, OrmResult, ValidationError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{AnyEntity, Entity, EntityId, EntityKind, EntityRef, Post, PostTag, Tag, User};
pub use relation::{Collection, Reference, ReferenceOrigin, ReferenceState};
pub use store::{Filter, FilterValue, Row, SqliteStore, Store};
pub use uow::identity_map::IdentityMap;
pub use uow::{FindOptions, FlushSummary, UnitOfWork, UnitOfWorkState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
