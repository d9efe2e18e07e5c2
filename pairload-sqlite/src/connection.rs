use crate::{CBox, SqliteDriver, SqliteTransaction, error_message_from_ptr, extract::extract_value};
use libsqlite3_sys::{
    SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_MEMORY, SQLITE_OPEN_READONLY,
    SQLITE_OPEN_READWRITE, SQLITE_ROW, SQLITE_TRANSIENT, sqlite3, sqlite3_bind_double,
    sqlite3_bind_int64, sqlite3_bind_null, sqlite3_bind_text, sqlite3_busy_timeout,
    sqlite3_changes, sqlite3_close, sqlite3_column_count, sqlite3_errmsg, sqlite3_exec,
    sqlite3_extended_errcode, sqlite3_extended_result_codes, sqlite3_finalize,
    sqlite3_get_autocommit, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_sql, sqlite3_step,
    sqlite3_stmt, sqlite3_stmt_readonly,
};
use pairload_core::{
    Connection, Context, Driver, Error, Executor, Query, Result, Row, RowsAffected, Value,
    log_context, truncate_long,
};
use std::{
    borrow::Cow,
    ffi::{CStr, CString, c_char, c_int},
    ptr,
};
use tokio::task::spawn_blocking;

/// Error reported by the sqlite engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (sqlite code {code})")]
pub struct SqliteError {
    /// Extended result code.
    pub code: c_int,
    pub message: String,
}

impl SqliteError {
    pub(crate) fn from_connection(connection: *mut sqlite3) -> Self {
        unsafe {
            Self {
                code: sqlite3_extended_errcode(connection),
                message: error_message_from_ptr(sqlite3_errmsg(connection)),
            }
        }
    }

    pub fn primary_code(&self) -> c_int {
        self.code & 0xff
    }
}

/// Options of a `sqlite://path?mode=rwc&busy_timeout=0` url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub path: String,
    pub flags: c_int,
    /// Milliseconds a statement waits on a locked database before failing
    /// with `SQLITE_BUSY`.
    pub busy_timeout: c_int,
}

impl SqliteOptions {
    pub fn parse(url: &str) -> Result<Self> {
        let prefix = format!("{}://", SqliteDriver::NAME);
        let Some(rest) = url.strip_prefix(&prefix) else {
            return Err(Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                prefix
            )));
        };
        let (path, params) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path)
            .context("The database path is not valid percent encoded utf8")?
            .into_owned();
        if path.is_empty() {
            return Err(Error::msg("The database path is empty"));
        }
        let mut result = Self {
            path,
            flags: SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
            busy_timeout: 0,
        };
        for param in params.split('&').filter(|v| !v.is_empty()) {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            let value = urlencoding::decode(value)
                .with_context(|| format!("Invalid value of parameter `{}`", key))?;
            match key {
                "mode" => {
                    result.flags = match &*value {
                        "ro" => SQLITE_OPEN_READONLY,
                        "rw" => SQLITE_OPEN_READWRITE,
                        "rwc" => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                        "memory" => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_MEMORY,
                        _ => {
                            return Err(Error::msg(format!(
                                "Unknown mode `{}`, expected one of: ro, rw, rwc, memory",
                                value
                            )));
                        }
                    }
                }
                "busy_timeout" => {
                    result.busy_timeout = value
                        .parse::<u32>()
                        .ok()
                        .and_then(|v| c_int::try_from(v).ok())
                        .ok_or_else(|| {
                            Error::msg(format!(
                                "Expected busy_timeout to be milliseconds, found `{}`",
                                value
                            ))
                        })?;
                }
                _ => log::warn!("Ignoring unknown sqlite connection parameter `{}`", key),
            }
        }
        Ok(result)
    }
}

pub struct SqliteConnection {
    pub(crate) connection: CBox<sqlite3>,
}

impl SqliteConnection {
    pub(crate) fn in_transaction(&self) -> bool {
        unsafe { sqlite3_get_autocommit(*self.connection) == 0 }
    }

    /// Run `query` on a blocking thread and return its rows and the changes it made.
    pub(crate) async fn run(&mut self, query: Query) -> Result<(Vec<Row>, RowsAffected)> {
        let connection = self.connection.borrowed();
        let context = format!("While running the query:\n{}", query);
        spawn_blocking(move || run_statement(*connection, &query))
            .await?
            .context(context)
    }
}

/// Run one or more statements without parameters nor results.
pub(crate) fn exec(connection: *mut sqlite3, sql: &str) -> Result<()> {
    let sql = CString::new(sql).context("Could not create a CString from the query String")?;
    unsafe {
        let rc = sqlite3_exec(
            connection,
            sql.as_ptr(),
            None,
            ptr::null_mut(),
            ptr::null_mut(),
        );
        if rc != SQLITE_OK {
            return Err(SqliteError::from_connection(connection).into());
        }
    }
    Ok(())
}

fn run_statement(connection: *mut sqlite3, query: &Query) -> Result<(Vec<Row>, RowsAffected)> {
    let sql =
        CString::new(query.sql.as_str()).context("Could not create a CString from the query String")?;
    unsafe {
        let mut statement = CBox::null(|p| {
            sqlite3_finalize(p);
        });
        let mut tail = ptr::null();
        let rc = sqlite3_prepare_v2(connection, sql.as_ptr(), -1, &mut *statement, &mut tail);
        if rc != SQLITE_OK {
            return Err(SqliteError::from_connection(connection).into());
        }
        if statement.is_null() {
            // Whitespace or comments only
            return Ok((Vec::new(), 0));
        }
        if !tail.is_null() && !CStr::from_ptr(tail).to_bytes().trim_ascii().is_empty() {
            return Err(Error::msg("Cannot run more than one statement at a time"));
        }
        bind(connection, *statement, &query.params)?;
        let count = sqlite3_column_count(*statement);
        let mut rows = Vec::new();
        loop {
            match sqlite3_step(*statement) {
                SQLITE_ROW => rows.push(
                    (0..count)
                        .map(|i| extract_value(*statement, i))
                        .collect::<Result<Row>>()?,
                ),
                SQLITE_DONE => break,
                _ => return Err(SqliteError::from_connection(connection).into()),
            }
        }
        let changes = if sqlite3_stmt_readonly(*statement) != 0 {
            0
        } else {
            sqlite3_changes(connection).max(0) as RowsAffected
        };
        Ok((rows, changes))
    }
}

fn bind(connection: *mut sqlite3, statement: *mut sqlite3_stmt, params: &[Value]) -> Result<()> {
    for (i, value) in params.iter().enumerate() {
        let index = (i + 1) as c_int;
        let rc = unsafe {
            match value {
                Value::Null
                | Value::Int64(None)
                | Value::Float64(None)
                | Value::Decimal(None)
                | Value::Varchar(None) => sqlite3_bind_null(statement, index),
                Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
                Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
                // Stored as text to keep the exact cents
                Value::Decimal(Some(v)) => bind_text(statement, index, &v.to_string()),
                Value::Varchar(Some(v)) => bind_text(statement, index, v),
            }
        };
        if rc != SQLITE_OK {
            let sql = unsafe { CStr::from_ptr(sqlite3_sql(statement)) };
            return Err(Error::new(SqliteError::from_connection(connection)).context(format!(
                "Cannot bind parameter {} to query:\n{}",
                index,
                truncate_long!(sql.to_string_lossy())
            )));
        }
    }
    Ok(())
}

unsafe fn bind_text(statement: *mut sqlite3_stmt, index: c_int, value: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            value.as_ptr() as *const c_char,
            value.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

fn open(path: CString, options: SqliteOptions) -> Result<CBox<sqlite3>> {
    unsafe {
        let mut connection = CBox::null(|p| {
            sqlite3_close(p);
        });
        let rc = sqlite3_open_v2(path.as_ptr(), &mut *connection, options.flags, ptr::null());
        if rc != SQLITE_OK {
            if connection.is_null() {
                return Err(Error::msg("Could not allocate the sqlite connection"));
            }
            return Err(SqliteError::from_connection(*connection).into());
        }
        sqlite3_extended_result_codes(*connection, 1);
        sqlite3_busy_timeout(*connection, options.busy_timeout);
        exec(*connection, "PRAGMA foreign_keys = ON")?;
        Ok(connection)
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        &SqliteDriver {}
    }

    async fn execute(&mut self, query: Query) -> Result<RowsAffected> {
        Ok(self.run(query).await?.1)
    }

    async fn fetch(&mut self, query: Query) -> Result<Vec<Row>> {
        Ok(self.run(query).await?.0)
    }
}

impl Connection for SqliteConnection {
    type Transaction<'c> = SqliteTransaction<'c>;

    async fn connect(url: Cow<'static, str>) -> Result<SqliteConnection> {
        let options = SqliteOptions::parse(&url)
            .map_err(|e| log_context!(e, "Error while decoding connection URL: `{}`", url))?;
        let path = CString::new(options.path.as_str())
            .map_err(|e| log_context!(e, "Error while decoding connection URL: `{}`", url))?;
        let connection = spawn_blocking(move || open(path, options))
            .await?
            .map_err(|e| log_context!(e, "Could not open the database `{}`", url))?;
        Ok(Self { connection })
    }

    async fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        SqliteTransaction::new(self).await
    }
}
