use crate::{PostgresConnection, PostgresSqlWriter};
use pairload_core::{Driver, Error, ErrorClass};
use tokio_postgres::error::SqlState;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDriver {}

impl PostgresDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

/// SQLSTATE of the backend error carried by `error`, if any.
pub fn sql_state(error: &Error) -> Option<&SqlState> {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<tokio_postgres::Error>())
        .and_then(tokio_postgres::Error::code)
}

impl Driver for PostgresDriver {
    type Connection = PostgresConnection;
    type SqlWriter = PostgresSqlWriter;

    const NAME: &'static str = "postgres";

    fn get_instance() -> Self {
        Self::new()
    }

    fn sql_writer(&self) -> PostgresSqlWriter {
        PostgresSqlWriter {}
    }

    /// `40001` (serialization_failure, also CockroachDB's restart errors) and
    /// `40P01` (deadlock_detected) are retryable.
    fn classify(&self, error: &Error) -> ErrorClass {
        match sql_state(error) {
            Some(state)
                if *state == SqlState::T_R_SERIALIZATION_FAILURE
                    || *state == SqlState::T_R_DEADLOCK_DETECTED =>
            {
                ErrorClass::Retryable
            }
            _ => ErrorClass::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairload_core::Context;

    #[test]
    fn foreign_errors_are_fatal() {
        let driver = PostgresDriver::new();
        let error = Err::<(), _>(Error::msg("could not serialize access"))
            .context("While committing")
            .unwrap_err();
        assert_eq!(sql_state(&error), None);
        assert_eq!(driver.classify(&error), ErrorClass::Fatal);
        assert_eq!(SqlState::T_R_SERIALIZATION_FAILURE.code(), "40001");
        assert_eq!(SqlState::T_R_DEADLOCK_DETECTED.code(), "40P01");
    }
}
