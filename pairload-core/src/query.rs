use crate::{AsValue, Value, truncate_long};
use std::fmt::{self, Display};

/// A sql statement with its positional parameters.
///
/// The placeholders in `sql` are written by the driver's [`crate::SqlWriter`],
/// `params` are bound to them in order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
    /// Append a parameter value.
    pub fn bind(mut self, value: impl AsValue) -> Self {
        self.params.push(value.as_value());
        self
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Query::new(value)
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Query::new(value)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))?;
        if !self.params.is_empty() {
            f.write_str(" with parameters: ")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                param.fmt(f)?;
            }
        }
        Ok(())
    }
}

pub type RowsAffected = u64;

/// Decoded row, columns in select order.
pub type Row = Box<[Value]>;
