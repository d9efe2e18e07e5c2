use crate::{Executor, Result, Transaction};
use std::{borrow::Cow, future::Future};

pub trait Connection: Executor {
    type Transaction<'c>: Transaction<'c, Driver = Self::Driver>
    where
        Self: 'c;

    /// Establish a connection to the given url.
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send;

    /// Start a transaction, dropping it without committing rolls it back.
    fn begin(&mut self) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;

    /// Close the connection.
    fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
        async move {
            drop(self);
            Ok(())
        }
    }
}
