use crate::{SqliteConnection, SqliteError, SqliteSqlWriter};
use libsqlite3_sys::{SQLITE_BUSY, SQLITE_LOCKED};
use pairload_core::{Driver, Error, ErrorClass};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;
    type SqlWriter = SqliteSqlWriter;

    const NAME: &'static str = "sqlite";

    fn get_instance() -> Self {
        Self::new()
    }

    fn sql_writer(&self) -> SqliteSqlWriter {
        SqliteSqlWriter {}
    }

    /// `SQLITE_BUSY` and `SQLITE_LOCKED` are retryable, whatever the extended code.
    fn classify(&self, error: &Error) -> ErrorClass {
        match error.chain().find_map(|e| e.downcast_ref::<SqliteError>()) {
            Some(e) if matches!(e.primary_code(), SQLITE_BUSY | SQLITE_LOCKED) => {
                ErrorClass::Retryable
            }
            _ => ErrorClass::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsqlite3_sys::SQLITE_CONSTRAINT;
    use pairload_core::Context;

    fn error(code: i32) -> Error {
        Err::<(), _>(SqliteError {
            code,
            message: "database is locked".into(),
        })
        .context("While running the query")
        .unwrap_err()
    }

    #[test]
    fn classification() {
        let driver = SqliteDriver::new();
        assert_eq!(driver.classify(&error(SQLITE_BUSY)), ErrorClass::Retryable);
        assert_eq!(driver.classify(&error(SQLITE_BUSY | (2 << 8))), ErrorClass::Retryable);
        assert_eq!(driver.classify(&error(SQLITE_LOCKED)), ErrorClass::Retryable);
        assert_eq!(
            driver.classify(&error(SQLITE_LOCKED | (1 << 8))),
            ErrorClass::Retryable
        );
        assert_eq!(
            driver.classify(&error(SQLITE_CONSTRAINT | (3 << 8))),
            ErrorClass::Fatal
        );
        assert_eq!(
            driver.classify(&Error::msg("database is locked")),
            ErrorClass::Fatal
        );
    }
}
