use crate::{Driver, Query, Result, Row, RowsAffected, Value};
use std::future::Future;

pub trait Executor: Send + Sized {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// Execute the statement and return the number of rows affected.
    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Execute the query and collect the rows it returns.
    fn fetch(&mut self, query: Query) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// First column of the first row, `None` when no row is returned.
    fn fetch_scalar(&mut self, query: Query) -> impl Future<Output = Result<Option<Value>>> + Send {
        let rows = self.fetch(query);
        async move {
            Ok(rows
                .await?
                .into_iter()
                .next()
                .and_then(|row| row.into_vec().into_iter().next()))
        }
    }
}
