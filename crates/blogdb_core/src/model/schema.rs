//! Declarative entity schema descriptors.
//!
//! Each entity publishes one static `EntitySchema`. The field validator reads
//! `fields` and the required belongs-to relations; the unit of work reads
//! relation columns for cascade, populate and collection loading.

use crate::model::EntityKind;

/// Scalar field constraint. Lengths are counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Required,
    MinLength(usize),
    MaxLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub column: &'static str,
    pub constraints: &'static [Constraint],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Owning side; stored as `column` on this entity's table.
    BelongsTo { column: &'static str, required: bool },
    /// Inverse side of a `BelongsTo`; `mapped_by` is the column on the target table.
    HasMany { mapped_by: &'static str },
    /// Join through `pivot`; `owner_column` points back at this entity,
    /// `target_column` at the related one.
    ManyToMany {
        pivot: EntityKind,
        owner_column: &'static str,
        target_column: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSchema {
    pub name: &'static str,
    pub target: EntityKind,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub fields: &'static [FieldSchema],
    pub relations: &'static [RelationSchema],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// Belongs-to relations with their column and `required` flag, in declaration order.
    pub fn belongs_to(&self) -> impl Iterator<Item = (&'static str, &'static str, bool)> + '_ {
        self.relations
            .iter()
            .filter_map(|relation| match relation.kind {
                RelationKind::BelongsTo { column, required } => {
                    Some((relation.name, column, required))
                }
                _ => None,
            })
    }
}
