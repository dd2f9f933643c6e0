//! SQLite-backed `Store`.
//!
//! # Responsibility
//! - Translate equality filters and column lists into parameterized SQL.
//! - Map `begin`/`commit`/`rollback` onto one SQLite transaction.
//!
//! # Invariants
//! - Identifiers are interpolated only after passing `check_identifier`;
//!   values are always bound as parameters.
//! - At most one transaction is open at a time.

use super::{Filter, Row, Store};
use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::{EntityId, EntityKind};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeMap;
use std::path::Path;

/// `Store` over one migrated SQLite connection.
pub struct SqliteStore {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteStore {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    fn select(&self, kind: EntityKind, filter: &Filter, suffix: &str) -> DbResult<Vec<Row>> {
        let (where_sql, binds) = where_clause(filter)?;
        let sql = format!(
            "SELECT * FROM {}{where_sql} ORDER BY id ASC{suffix};",
            kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut decoded = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = BTreeMap::new();
            for (index, name) in names.iter().enumerate() {
                values.insert(name.clone(), row.get::<_, Value>(index)?);
            }
            decoded.push(Row::new(values));
        }
        Ok(decoded)
    }
}

impl Store for SqliteStore {
    fn find_one(&self, kind: EntityKind, filter: &Filter) -> DbResult<Option<Row>> {
        Ok(self.select(kind, filter, " LIMIT 1")?.into_iter().next())
    }

    fn find(&self, kind: EntityKind, filter: &Filter) -> DbResult<Vec<Row>> {
        self.select(kind, filter, "")
    }

    fn count(&self, kind: EntityKind, filter: &Filter) -> DbResult<u64> {
        let (where_sql, binds) = where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM {}{where_sql};", kind.table());
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn insert(
        &mut self,
        kind: EntityKind,
        columns: &[(&'static str, Value)],
    ) -> DbResult<EntityId> {
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES;", kind.table())
        } else {
            let mut names = Vec::with_capacity(columns.len());
            for (name, _) in columns {
                names.push(check_identifier(name)?);
            }
            let placeholders = (1..=columns.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                kind.table(),
                names.join(", ")
            )
        };

        self.conn
            .execute(&sql, params_from_iter(columns.iter().map(|(_, value)| value)))?;
        let id = self.conn.last_insert_rowid();
        debug!("event=store_insert module=store status=ok table={} id={id}", kind.table());
        Ok(id)
    }

    fn update(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        columns: &[(&'static str, Value)],
    ) -> DbResult<usize> {
        if columns.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(columns.len());
        for (index, (name, _)) in columns.iter().enumerate() {
            assignments.push(format!("{} = ?{}", check_identifier(name)?, index + 1));
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{};",
            kind.table(),
            assignments.join(", "),
            columns.len() + 1
        );

        let mut binds: Vec<Value> = columns.iter().map(|(_, value)| value.clone()).collect();
        binds.push(Value::Integer(id));
        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed)
    }

    fn delete(&mut self, kind: EntityKind, filter: &Filter) -> DbResult<usize> {
        let (where_sql, binds) = where_clause(filter)?;
        let sql = format!("DELETE FROM {}{where_sql};", kind.table());
        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed)
    }

    fn begin(&mut self) -> DbResult<()> {
        if self.in_transaction {
            return Err(DbError::TransactionState("transaction already open"));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            return Err(DbError::TransactionState("commit without open transaction"));
        }
        self.conn.execute_batch("COMMIT;")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            return Err(DbError::TransactionState("rollback without open transaction"));
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }
}

fn where_clause(filter: &Filter) -> DbResult<(String, Vec<Value>)> {
    if filter.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut clauses = Vec::with_capacity(filter.conditions().len());
    let mut binds = Vec::new();
    for (column, value) in filter.conditions() {
        let column = check_identifier(column)?;
        if matches!(value, Value::Null) {
            clauses.push(format!("{column} IS NULL"));
        } else {
            binds.push(value.clone());
            clauses.push(format!("{column} = ?{}", binds.len()));
        }
    }
    Ok((format!(" WHERE {}", clauses.join(" AND ")), binds))
}

fn check_identifier(name: &str) -> DbResult<&str> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(name)
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}
