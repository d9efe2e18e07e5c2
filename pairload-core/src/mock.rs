//! In memory backend scripted to fail, used by the unit tests.

use crate::{
    Connection, Driver, Error, ErrorClass, Executor, Query, Result, Row, RowsAffected, SqlWriter,
    TableNames, Transaction, Value,
};
use std::{borrow::Cow, collections::HashMap, future};

#[derive(Debug, thiserror::Error)]
#[error("scripted {0:?} failure")]
pub(crate) struct MockFault(pub(crate) ErrorClass);

/// Statement of the transaction that fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum MockPoint {
    InsertOrder,
    InsertFill,
    Commit,
}

#[derive(Default)]
pub(crate) struct MockDriver;

pub(crate) struct MockWriter;

impl SqlWriter for MockWriter {
    fn write_last_identity(&self, out: &mut String, _tables: &TableNames) {
        out.push_str("SELECT last_identity()");
    }
    fn write_create_schema(&self, _tables: &TableNames) -> Vec<String> {
        Vec::new()
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;
    type SqlWriter = MockWriter;
    const NAME: &'static str = "mock";
    fn get_instance() -> Self {
        MockDriver
    }
    fn sql_writer(&self) -> MockWriter {
        MockWriter
    }
    fn classify(&self, error: &Error) -> ErrorClass {
        error
            .chain()
            .find_map(|e| e.downcast_ref::<MockFault>())
            .map(|f| f.0)
            .unwrap_or(ErrorClass::Fatal)
    }
}

#[derive(Default)]
pub(crate) struct MockConnection {
    /// Failure injected at the given attempt (from 1).
    pub(crate) faults: HashMap<u32, (MockPoint, ErrorClass)>,
    pub(crate) every_attempt: Option<(MockPoint, ErrorClass)>,
    /// Attempt whose order insert never completes.
    pub(crate) hang_at: Option<u32>,
    pub(crate) begun: u32,
    pub(crate) rollbacks: u32,
    pub(crate) orders: Vec<i64>,
    /// Order id referenced by each fill.
    pub(crate) fills: Vec<i64>,
    next_id: i64,
}

impl MockConnection {
    fn fault(&self, point: MockPoint) -> Result<()> {
        let planned = self.faults.get(&self.begun).copied().or(self.every_attempt);
        match planned {
            Some((at, class)) if at == point => Err(Error::new(MockFault(class))),
            _ => Ok(()),
        }
    }
    fn count(&self, sql: &str) -> Option<Value> {
        if sql.ends_with("\"orders\"") {
            Some(Value::Int64(Some(self.orders.len() as i64)))
        } else if sql.ends_with("\"order_fills\"") {
            Some(Value::Int64(Some(self.fills.len() as i64)))
        } else {
            None
        }
    }
}

impl Executor for MockConnection {
    type Driver = MockDriver;
    fn driver(&self) -> &MockDriver {
        &MockDriver
    }
    async fn execute(&mut self, _query: Query) -> Result<RowsAffected> {
        Ok(0)
    }
    async fn fetch(&mut self, query: Query) -> Result<Vec<Row>> {
        Ok(self
            .count(&query.sql)
            .map(|v| vec![vec![v].into_boxed_slice()])
            .unwrap_or_default())
    }
}

impl Connection for MockConnection {
    type Transaction<'c> = MockTransaction<'c>;

    async fn connect(url: Cow<'static, str>) -> Result<Self> {
        if url.starts_with("mock://") {
            Ok(Self::default())
        } else {
            Err(Error::msg(format!("Unexpected url `{}`", url)))
        }
    }

    async fn begin(&mut self) -> Result<MockTransaction<'_>> {
        self.begun += 1;
        Ok(MockTransaction {
            connection: self,
            order: None,
            fill: None,
        })
    }
}

pub(crate) struct MockTransaction<'c> {
    connection: &'c mut MockConnection,
    order: Option<i64>,
    fill: Option<i64>,
}

impl<'c> Executor for MockTransaction<'c> {
    type Driver = MockDriver;
    fn driver(&self) -> &MockDriver {
        &MockDriver
    }
    async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        self.connection.fault(MockPoint::InsertFill)?;
        let Some(Value::Int64(Some(order_id))) = query.params.first() else {
            return Err(Error::msg("The fill must reference an order"));
        };
        if self.order != Some(*order_id) {
            return Err(Error::msg("Foreign key violation"));
        }
        self.fill = Some(*order_id);
        Ok(1)
    }
    async fn fetch(&mut self, _query: Query) -> Result<Vec<Row>> {
        if self.connection.hang_at == Some(self.connection.begun) {
            future::pending::<()>().await;
        }
        self.connection.fault(MockPoint::InsertOrder)?;
        self.connection.next_id += 1;
        let id = self.connection.next_id;
        self.order = Some(id);
        Ok(vec![vec![Value::Int64(Some(id))].into_boxed_slice()])
    }
}

impl<'c> Transaction<'c> for MockTransaction<'c> {
    async fn commit(self) -> Result<()> {
        if let Err(e) = self.connection.fault(MockPoint::Commit) {
            self.connection.rollbacks += 1;
            return Err(e);
        }
        self.connection.orders.extend(self.order);
        self.connection.fills.extend(self.fill);
        Ok(())
    }
    async fn rollback(self) -> Result<()> {
        self.connection.rollbacks += 1;
        Ok(())
    }
}
