#![allow(dead_code)]

use blogdb_core::db::{DbError, DbResult};
use blogdb_core::{EntityId, EntityKind, Filter, Row, SqliteStore, Store, UnitOfWork};
use rusqlite::types::Value;
use std::cell::Cell;

/// `SqliteStore` wrapper counting calls, used to prove lookups skip the store.
pub struct CountingStore {
    inner: SqliteStore,
    reads: Cell<usize>,
    writes: usize,
    rollbacks: usize,
    refuse_begin: bool,
}

impl CountingStore {
    pub fn in_memory() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            reads: Cell::new(0),
            writes: 0,
            rollbacks: 0,
            refuse_begin: false,
        }
    }

    /// Makes every later `begin` fail without opening a transaction.
    pub fn refuse_begin(&mut self) {
        self.refuse_begin = true;
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn calls(&self) -> usize {
        self.reads() + self.writes()
    }

    fn read(&self) {
        self.reads.set(self.reads.get() + 1);
    }
}

impl Store for CountingStore {
    fn find_one(&self, kind: EntityKind, filter: &Filter) -> DbResult<Option<Row>> {
        self.read();
        self.inner.find_one(kind, filter)
    }

    fn find(&self, kind: EntityKind, filter: &Filter) -> DbResult<Vec<Row>> {
        self.read();
        self.inner.find(kind, filter)
    }

    fn count(&self, kind: EntityKind, filter: &Filter) -> DbResult<u64> {
        self.read();
        self.inner.count(kind, filter)
    }

    fn insert(&mut self, kind: EntityKind, columns: &[(&'static str, Value)]) -> DbResult<EntityId> {
        self.writes += 1;
        self.inner.insert(kind, columns)
    }

    fn update(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        columns: &[(&'static str, Value)],
    ) -> DbResult<usize> {
        self.writes += 1;
        self.inner.update(kind, id, columns)
    }

    fn delete(&mut self, kind: EntityKind, filter: &Filter) -> DbResult<usize> {
        self.writes += 1;
        self.inner.delete(kind, filter)
    }

    fn begin(&mut self) -> DbResult<()> {
        if self.refuse_begin {
            return Err(DbError::TransactionState("begin refused"));
        }
        self.inner.begin()
    }

    fn commit(&mut self) -> DbResult<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.rollbacks += 1;
        self.inner.rollback()
    }
}

pub fn counting_uow() -> UnitOfWork<CountingStore> {
    UnitOfWork::new(CountingStore::in_memory())
}

pub fn sqlite_uow() -> UnitOfWork<SqliteStore> {
    UnitOfWork::new(SqliteStore::open_in_memory().unwrap())
}

pub fn rows<S: Store>(uow: &UnitOfWork<S>, kind: EntityKind) -> u64 {
    uow.store().count(kind, &Filter::all()).unwrap()
}
