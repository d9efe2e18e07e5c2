use crate::{SqliteConnection, SqliteDriver, connection::exec};
use pairload_core::{
    Driver, Executor, Query, Result, Row, RowsAffected, SqlWriter, Transaction,
};
use std::future::Future;

/// Transaction started with `BEGIN IMMEDIATE`, rolled back when dropped unfinished.
pub struct SqliteTransaction<'c> {
    connection: &'c mut SqliteConnection,
    finished: bool,
}

impl<'c> SqliteTransaction<'c> {
    pub(crate) async fn new(connection: &'c mut SqliteConnection) -> Result<Self> {
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_transaction_begin(&mut sql);
        connection.execute(sql.into()).await?;
        Ok(Self {
            connection,
            finished: false,
        })
    }

    async fn rollback_open(&mut self) -> Result<()> {
        self.finished = true;
        if !self.connection.in_transaction() {
            return Ok(());
        }
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        self.connection.execute(sql.into()).await.map(|_| ())
    }
}

impl<'c> Executor for SqliteTransaction<'c> {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        self.connection.driver()
    }

    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.connection.execute(query)
    }

    fn fetch(&mut self, query: Query) -> impl Future<Output = Result<Vec<Row>>> + Send {
        self.connection.fetch(query)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    async fn commit(mut self) -> Result<()> {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_commit(&mut sql);
        let result = self.connection.execute(sql.into()).await;
        self.finished = true;
        if let Err(e) = result {
            // A busy commit leaves the transaction open
            if let Err(rollback) = self.rollback_open().await {
                log::error!("Could not roll back after a failed commit: {:#}", rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.rollback_open().await
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished || !self.connection.in_transaction() {
            return;
        }
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        if let Err(e) = exec(*self.connection.connection, &sql) {
            log::error!("Could not roll back the abandoned transaction: {:#}", e);
        }
    }
}
