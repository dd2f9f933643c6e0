//! Error taxonomy for the unit of work and its collaborators.
//!
//! # Responsibility
//! - Give every failure of load/assign/flush a semantic variant.
//! - Keep transport errors (`DbError`) distinct from contract violations.
//!
//! # Invariants
//! - Errors are returned to the caller of the triggering operation, never
//!   swallowed or retried.
//! - `ValidationError` always carries at least one violation message.

use crate::db::DbError;
use crate::model::{EntityId, EntityKind};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OrmResult<T> = Result<T, OrmError>;

/// Violations collected by the validation gate for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Kind of the first entity (in flush order) that failed.
    pub kind: EntityKind,
    /// Every violated constraint of that entity, in declaration order.
    pub details: Vec<String>,
}

impl ValidationError {
    pub fn new(kind: EntityKind, details: Vec<String>) -> Self {
        Self { kind, details }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = if self.details.len() > 1 {
            "validation errors"
        } else {
            "validation error"
        };
        write!(f, "{label}: {}", self.details.join(", "))
    }
}

impl Error for ValidationError {}

/// Failure of an identity-map, reference or unit-of-work operation.
#[derive(Debug)]
pub enum OrmError {
    /// Flush rejected by the validation gate; nothing was written.
    Validation(ValidationError),
    /// Key does not resolve to a stored row (`key: None` for an unset reference).
    NotFound {
        kind: EntityKind,
        key: Option<EntityId>,
    },
    /// Accessor used before `load()`.
    NotLoaded { kind: EntityKind },
    /// Foreign-key write on an entity that is not attached to a live unit of work.
    Detached { kind: EntityKind },
    /// `persist` of an instance whose row is already mapped to another instance.
    IdentityConflict { kind: EntityKind, key: EntityId },
    /// Relation name not declared in the entity schema.
    UnknownRelation {
        kind: EntityKind,
        relation: String,
    },
    /// Stored row cannot be decoded into an entity.
    InvalidData(String),
    Db(DbError),
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound {
                kind,
                key: Some(key),
            } => write!(f, "{kind} not found: {key}"),
            Self::NotFound { kind, key: None } => {
                write!(f, "{kind} not found: reference is unset")
            }
            Self::NotLoaded { kind } => {
                write!(f, "{kind} reference is not loaded; call load() first")
            }
            Self::Detached { kind } => write!(
                f,
                "{kind} is not attached to a unit of work; persist it before assigning by foreign key"
            ),
            Self::UnknownRelation { kind, relation } => {
                write!(f, "{kind} has no relation named `{relation}`")
            }
            Self::IdentityConflict { kind, key } => write!(
                f,
                "{kind} {key} is already managed by another instance in this unit of work"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OrmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for OrmError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for OrmError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for OrmError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{OrmError, ValidationError};
    use crate::model::EntityKind;

    #[test]
    fn validation_error_pluralizes_label() {
        let single = ValidationError::new(EntityKind::User, vec!["a".to_string()]);
        assert_eq!(single.to_string(), "validation error: a");

        let many = ValidationError::new(EntityKind::User, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(many.to_string(), "validation errors: a, b");
    }

    #[test]
    fn not_found_without_key_mentions_unset_reference() {
        let err = OrmError::NotFound {
            kind: EntityKind::Post,
            key: None,
        };
        assert!(err.to_string().contains("unset"));
    }
}
