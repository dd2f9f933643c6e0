//! Store contract consumed by the unit of work.
//!
//! # Responsibility
//! - Define the row-level operations the core needs from a relational store.
//! - Provide the equality `Filter` and decoded `Row` shapes shared by all stores.
//!
//! # Invariants
//! - Stores never validate entities; validation happens before any write call.
//! - Writes issued between `begin` and `commit` are applied as one unit or not at all.

pub mod sqlite;

use crate::db::DbResult;
use crate::error::{OrmError, OrmResult};
use crate::model::{EntityId, EntityKind};
use rusqlite::types::Value;
use std::collections::BTreeMap;

pub use sqlite::SqliteStore;

/// Conjunction of column equality conditions.
///
/// A `Value::Null` condition matches `IS NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the row with the given primary key.
    pub fn by_id(id: EntityId) -> Self {
        Self::all().eq("id", id)
    }

    /// Adds `column = value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl FilterValue) -> Self {
        self.conditions.push((column.into(), value.into_value()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Values accepted on the right-hand side of a `Filter` condition.
pub trait FilterValue {
    fn into_value(self) -> Value;
}

impl FilterValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FilterValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FilterValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl FilterValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

/// `None` matches `IS NULL`.
impl FilterValue for Option<i64> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, Value::Integer)
    }
}

/// One stored row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Primary key of the row.
    pub fn id(&self) -> OrmResult<EntityId> {
        self.integer("id")
    }

    /// Reads a non-null integer column.
    pub fn integer(&self, column: &str) -> OrmResult<i64> {
        match self.optional_integer(column)? {
            Some(value) => Ok(value),
            None => Err(OrmError::InvalidData(format!(
                "column `{column}` is null"
            ))),
        }
    }

    /// Reads a nullable integer column.
    pub fn optional_integer(&self, column: &str) -> OrmResult<Option<i64>> {
        match self.values.get(column) {
            Some(Value::Integer(value)) => Ok(Some(*value)),
            Some(Value::Null) => Ok(None),
            Some(other) => Err(OrmError::InvalidData(format!(
                "column `{column}` holds {other:?}, expected integer"
            ))),
            None => Err(OrmError::InvalidData(format!("missing column `{column}`"))),
        }
    }

    /// Reads a text column; `NULL` decodes as an empty string.
    pub fn text(&self, column: &str) -> OrmResult<String> {
        match self.values.get(column) {
            Some(Value::Text(value)) => Ok(value.clone()),
            Some(Value::Null) => Ok(String::new()),
            Some(other) => Err(OrmError::InvalidData(format!(
                "column `{column}` holds {other:?}, expected text"
            ))),
            None => Err(OrmError::InvalidData(format!("missing column `{column}`"))),
        }
    }
}

/// Row-level access to a relational store.
///
/// `kind` selects the table (`EntityKind::table`). Column lists never include `id`;
/// keys are generated by the store on insert.
pub trait Store {
    fn find_one(&self, kind: EntityKind, filter: &Filter) -> DbResult<Option<Row>>;
    fn find(&self, kind: EntityKind, filter: &Filter) -> DbResult<Vec<Row>>;
    fn count(&self, kind: EntityKind, filter: &Filter) -> DbResult<u64>;
    /// Inserts one row and returns the generated primary key.
    fn insert(&mut self, kind: EntityKind, columns: &[(&'static str, Value)])
        -> DbResult<EntityId>;
    /// Updates one row by key; returns the number of rows changed.
    fn update(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        columns: &[(&'static str, Value)],
    ) -> DbResult<usize>;
    /// Deletes matching rows; returns the number of rows removed.
    fn delete(&mut self, kind: EntityKind, filter: &Filter) -> DbResult<usize>;
    fn begin(&mut self) -> DbResult<()>;
    fn commit(&mut self) -> DbResult<()>;
    fn rollback(&mut self) -> DbResult<()>;
}

#[cfg(test)]
mod tests {
    use super::{Filter, Row};
    use rusqlite::types::Value;
    use std::collections::BTreeMap;

    #[test]
    fn by_id_builds_single_condition() {
        let filter = Filter::by_id(7);
        assert_eq!(
            filter.conditions(),
            &[("id".to_string(), Value::Integer(7))]
        );
    }

    #[test]
    fn row_accessors_report_type_mismatch() {
        let mut values = BTreeMap::new();
        values.insert("id".to_string(), Value::Integer(3));
        values.insert("title".to_string(), Value::Text("hello".to_string()));
        values.insert("author_id".to_string(), Value::Null);
        let row = Row::new(values);

        assert_eq!(row.id().unwrap(), 3);
        assert_eq!(row.text("title").unwrap(), "hello");
        assert_eq!(row.optional_integer("author_id").unwrap(), None);
        assert!(row.integer("title").is_err());
        assert!(row.text("missing").is_err());
    }
}
