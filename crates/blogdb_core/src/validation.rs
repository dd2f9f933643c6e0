//! Field validator and pre-write validation gate.
//!
//! # Responsibility
//! - Evaluate declared field constraints and required relations of one entity.
//! - Gate inserts/updates in the unit of work on those results.
//!
//! # Invariants
//! - Pure: no store access, no mutation of the entity.
//! - Every violated constraint is reported, in declaration order (fields first,
//!   then belongs-to relations).

use crate::error::ValidationError;
use crate::model::schema::Constraint;
use crate::model::{AnyEntity, Entity};
use crate::relation::ReferenceState;

/// Human-readable violations of `entity`'s declared constraints.
pub fn errors<T: Entity>(entity: &T) -> Vec<String> {
    let schema = T::schema();
    let mut details = Vec::new();

    for field in schema.fields {
        let value = entity.field(field.name).unwrap_or_default();
        details.extend(
            field
                .constraints
                .iter()
                .filter_map(|constraint| check(field.name, value, *constraint)),
        );
    }

    for (name, _, required) in schema.belongs_to() {
        let unset = entity
            .link(name)
            .map_or(true, |link| link.state == ReferenceState::Unset);
        if required && unset {
            details.push(format!("{name} should not be empty"));
        }
    }

    details
}

pub fn is_valid<T: Entity>(entity: &T) -> bool {
    errors(entity).is_empty()
}

/// Validation run before an insert or update.
///
/// On top of `errors`, a required reference to an entity without a key is a
/// violation unless `scheduled` reports that entity as inserted earlier in the
/// same flush.
pub(crate) fn gate<T: Entity>(
    entity: &T,
    scheduled: &dyn Fn(&AnyEntity) -> bool,
) -> Result<(), ValidationError> {
    let mut details = errors(entity);

    for (name, _, required) in T::schema().belongs_to() {
        if !required {
            continue;
        }
        let Some(link) = entity.link(name) else {
            continue;
        };
        if link.state != ReferenceState::Initialized || link.key.is_some() {
            continue;
        }
        if !link.target.as_ref().is_some_and(|target| scheduled(target)) {
            details.push(format!("{name} must reference a persisted entity"));
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(T::KIND, details))
    }
}

fn check(field: &str, value: &str, constraint: Constraint) -> Option<String> {
    let length = value.chars().count();
    match constraint {
        Constraint::Required if value.is_empty() => Some(format!("{field} should not be empty")),
        Constraint::MinLength(min) if length < min => Some(format!(
            "{field} must be longer than or equal to {min} characters"
        )),
        Constraint::MaxLength(max) if length > max => Some(format!(
            "{field} must be shorter than or equal to {max} characters"
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{errors, gate, is_valid};
    use crate::model::{AnyEntity, Entity, Post, Tag, User};
    use crate::relation::Reference;

    fn nothing_scheduled(_: &AnyEntity) -> bool {
        false
    }

    #[test]
    fn empty_username_reports_every_violation() {
        let user = User::new("");
        assert_eq!(
            errors(&user),
            vec![
                "username should not be empty".to_string(),
                "username must be longer than or equal to 3 characters".to_string(),
            ]
        );
        assert!(!is_valid(&user));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(is_valid(&Tag::new("ñúé")));
        assert!(!is_valid(&Tag::new("x".repeat(17))));
        assert!(is_valid(&Tag::new("x".repeat(16))));
    }

    #[test]
    fn validator_is_repeatable() {
        let user = User::new("al");
        assert_eq!(errors(&user), errors(&user));
        assert_eq!(user.username, "al");
    }

    #[test]
    fn post_without_author_is_invalid() {
        let post = Post::new("hello");
        assert_eq!(errors(&post), vec!["author should not be empty".to_string()]);
    }

    #[test]
    fn gate_rejects_keyless_author_unless_scheduled() {
        let alice = User::new("alice").into_ref();
        let mut post = Post::new("hello");
        post.set_author(Reference::wrap(&alice));

        // The field validator only checks presence.
        assert!(is_valid(&post));

        let err = gate(&post, &nothing_scheduled).unwrap_err();
        assert_eq!(
            err.details,
            vec!["author must reference a persisted entity".to_string()]
        );

        let alice_any = User::into_any(alice.clone());
        assert!(gate(&post, &|target: &AnyEntity| target.same(&alice_any)).is_ok());

        alice.borrow_mut().set_id(Some(1));
        assert!(gate(&post, &nothing_scheduled).is_ok());
    }
}
