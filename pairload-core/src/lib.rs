mod connection;
mod driver;
mod error;
mod executor;
#[cfg(test)]
mod mock;
mod order;
mod pair;
mod query;
mod retry;
mod sql_writer;
mod store;
mod transaction;
mod util;
mod value;
mod workload;

pub use ::anyhow::Context;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use order::*;
pub use pair::*;
pub use query::*;
pub use retry::*;
pub use sql_writer::*;
pub use store::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use workload::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type Error = anyhow::Error;
