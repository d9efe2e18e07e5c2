use crate::{
    PostgresConnection, PostgresDriver,
    util::{execute, fetch},
};
use pairload_core::{Executor, Query, Result, Row, RowsAffected, Transaction};

/// Transaction at the isolation level of the connection.
///
/// Postgres rolls back a transaction whose commit failed, dropping it
/// unfinished rolls it back as well.
pub struct PostgresTransaction<'c>(pub(crate) tokio_postgres::Transaction<'c>);

impl<'c> PostgresTransaction<'c> {
    pub async fn new(connection: &'c mut PostgresConnection) -> Result<Self> {
        let isolation = connection.isolation;
        Ok(Self(
            connection
                .client
                .build_transaction()
                .isolation_level(isolation)
                .start()
                .await?,
        ))
    }
}

impl<'c> Executor for PostgresTransaction<'c> {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        execute(&self.0, query).await
    }

    async fn fetch(&mut self, query: Query) -> Result<Vec<Row>> {
        fetch(&self.0, query).await
    }
}

impl<'c> Transaction<'c> for PostgresTransaction<'c> {
    async fn commit(self) -> Result<()> {
        self.0.commit().await.map_err(Into::into)
    }

    async fn rollback(self) -> Result<()> {
        self.0.rollback().await.map_err(Into::into)
    }
}
