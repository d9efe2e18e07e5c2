mod cli;
mod config;

pub use cli::*;
pub use config::*;
pub use pairload_core::*;
pub use pairload_postgres as postgres;
pub use pairload_sqlite as sqlite;
