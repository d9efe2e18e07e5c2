use crate::{Connection, Error, SqlWriter};

/// Class of a failure as seen by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Transient write conflict or detected deadlock. The transaction was
    /// aborted without side effects and can be issued again verbatim.
    Retryable,
    /// Anything else: constraint violations, lost connections, malformed
    /// statements.
    Fatal,
}

pub trait Driver: Send + Sync + Sized {
    type Connection: Connection<Driver = Self>;
    type SqlWriter: SqlWriter;

    /// Scheme of the connection url.
    const NAME: &'static str;

    fn get_instance() -> Self;
    fn sql_writer(&self) -> Self::SqlWriter;

    /// Maps the native error carried by `error` (anywhere in its chain) to an
    /// [`ErrorClass`]. Errors that do not come from the backend are fatal.
    fn classify(&self, error: &Error) -> ErrorClass;
}
