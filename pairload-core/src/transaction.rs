use crate::{Executor, Result};
use std::future::Future;

pub trait Transaction<'c>: Executor {
    /// Commit the transaction. When the commit fails the transaction is rolled
    /// back before the error is returned.
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
