use pairload_core::{
    Connection, Driver, Error, ErrorClass, Executor, Query, Result, Row, RowsAffected, SqlWriter,
    TableNames, Transaction,
};
use std::{borrow::Cow, fmt};

/// Where a scripted failure is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Begin,
    OrderInsert,
    FillInsert,
    Commit,
}

/// Error raised in place of the real statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("injected {class:?} failure at {point:?} (attempt {attempt})")]
pub struct InjectedFault {
    pub point: FaultPoint,
    pub class: ErrorClass,
    pub attempt: u32,
}

#[derive(Debug, Clone)]
struct ScriptedFault {
    /// `None` fails every attempt.
    attempt: Option<u32>,
    point: FaultPoint,
    class: ErrorClass,
}

#[derive(Debug, Default)]
struct FaultScript {
    faults: Vec<ScriptedFault>,
    begun: u32,
    order_insert: String,
    fill_insert: String,
}

impl FaultScript {
    fn check(&self, point: FaultPoint) -> Result<()> {
        let attempt = self.begun;
        match self
            .faults
            .iter()
            .find(|f| f.point == point && f.attempt.is_none_or(|a| a == attempt))
        {
            Some(fault) => Err(Error::new(InjectedFault {
                point,
                class: fault.class,
                attempt,
            })),
            None => Ok(()),
        }
    }

    fn check_statement(&self, query: &Query) -> Result<()> {
        if query.sql == self.order_insert {
            self.check(FaultPoint::OrderInsert)
        } else if query.sql == self.fill_insert {
            self.check(FaultPoint::FillInsert)
        } else {
            Ok(())
        }
    }
}

/// Driver of a [`FaultyConnection`], injected faults classify as scripted.
#[derive(Debug, Default)]
pub struct FaultyDriver<D: Driver>(pub D);

impl<D: Driver> Driver for FaultyDriver<D> {
    type Connection = FaultyConnection<D::Connection>;
    type SqlWriter = D::SqlWriter;

    const NAME: &'static str = D::NAME;

    fn get_instance() -> Self {
        Self(D::get_instance())
    }

    fn sql_writer(&self) -> D::SqlWriter {
        self.0.sql_writer()
    }

    fn classify(&self, error: &Error) -> ErrorClass {
        match error.chain().find_map(|e| e.downcast_ref::<InjectedFault>()) {
            Some(fault) => fault.class,
            None => self.0.classify(error),
        }
    }
}

/// Wraps a real connection and fails chosen steps of chosen attempts.
///
/// Attempts are counted by the transactions begun on this connection, from 1.
/// Statements are recognized by comparing them with the inserts the driver
/// writes for `tables`.
pub struct FaultyConnection<C: Connection> {
    inner: C,
    driver: FaultyDriver<C::Driver>,
    script: FaultScript,
}

impl<C: Connection> FaultyConnection<C> {
    pub fn new(inner: C, tables: &TableNames) -> Self {
        let driver = FaultyDriver(C::Driver::get_instance());
        let writer = driver.sql_writer();
        let mut script = FaultScript::default();
        writer.write_insert_order(&mut script.order_insert, tables);
        writer.write_insert_fill(&mut script.fill_insert, tables);
        Self {
            inner,
            driver,
            script,
        }
    }

    /// Fail `point` of the `attempt`-th transaction with an error of `class`.
    pub fn fail_at(&mut self, attempt: u32, point: FaultPoint, class: ErrorClass) -> &mut Self {
        self.script.faults.push(ScriptedFault {
            attempt: Some(attempt),
            point,
            class,
        });
        self
    }

    /// Fail `point` of every transaction.
    pub fn fail_always(&mut self, point: FaultPoint, class: ErrorClass) -> &mut Self {
        self.script.faults.push(ScriptedFault {
            attempt: None,
            point,
            class,
        });
        self
    }

    /// Forget the faults and restart counting attempts.
    pub fn reset(&mut self) {
        self.script.faults.clear();
        self.script.begun = 0;
    }

    /// Transactions begun so far, failed ones included.
    pub fn begun(&self) -> u32 {
        self.script.begun
    }
}

impl<C: Connection> fmt::Debug for FaultyConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultyConnection")
            .field("driver", &C::Driver::NAME)
            .field("faults", &self.script.faults)
            .field("begun", &self.script.begun)
            .finish()
    }
}

impl<C: Connection> Executor for FaultyConnection<C> {
    type Driver = FaultyDriver<C::Driver>;

    fn driver(&self) -> &Self::Driver {
        &self.driver
    }

    async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        self.inner.execute(query).await
    }

    async fn fetch(&mut self, query: Query) -> Result<Vec<Row>> {
        self.inner.fetch(query).await
    }
}

impl<C: Connection> Connection for FaultyConnection<C> {
    type Transaction<'c>
        = FaultyTransaction<'c, C>
    where
        Self: 'c;

    async fn connect(url: Cow<'static, str>) -> Result<Self> {
        Ok(Self::new(C::connect(url).await?, &TableNames::default()))
    }

    async fn begin(&mut self) -> Result<FaultyTransaction<'_, C>> {
        self.script.begun += 1;
        self.script.check(FaultPoint::Begin)?;
        let inner = self.inner.begin().await?;
        Ok(FaultyTransaction {
            inner,
            driver: &self.driver,
            script: &self.script,
        })
    }

    async fn disconnect(self) -> Result<()> {
        self.inner.disconnect().await
    }
}

pub struct FaultyTransaction<'c, C: Connection + 'c> {
    inner: C::Transaction<'c>,
    driver: &'c FaultyDriver<C::Driver>,
    script: &'c FaultScript,
}

impl<'c, C: Connection + 'c> Executor for FaultyTransaction<'c, C> {
    type Driver = FaultyDriver<C::Driver>;

    fn driver(&self) -> &Self::Driver {
        self.driver
    }

    async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        self.script.check_statement(&query)?;
        self.inner.execute(query).await
    }

    async fn fetch(&mut self, query: Query) -> Result<Vec<Row>> {
        self.script.check_statement(&query)?;
        self.inner.fetch(query).await
    }
}

impl<'c, C: Connection + 'c> Transaction<'c> for FaultyTransaction<'c, C> {
    async fn commit(self) -> Result<()> {
        if let Err(e) = self.script.check(FaultPoint::Commit) {
            if let Err(rollback) = self.inner.rollback().await {
                log::error!("Could not roll back after the injected failure: {:#}", rollback);
            }
            return Err(e);
        }
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<()> {
        self.inner.rollback().await
    }
}
