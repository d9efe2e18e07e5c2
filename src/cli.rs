use crate::WorkloadConfig;
use clap::Parser;
use pairload_core::{RetryPolicy, TableNames};
use rust_decimal::Decimal;
use std::time::Duration;

/// Write orders and their fills to a database, one transaction per pair,
/// retrying the transactions that lose a conflict.
#[derive(Debug, Clone, Parser)]
#[command(name = "pairload", version, about)]
pub struct Args {
    /// Connection url, `postgres://`, `postgresql://` or `sqlite://`
    #[arg(long, env = "PAIRLOAD_URL")]
    pub url: String,
    /// Seconds between two orders
    #[arg(long, env = "PAIRLOAD_INTERVAL", default_value = "1", value_parser = parse_interval)]
    pub interval: Duration,
    /// Seconds left to the order in flight after ctrl-c, a second ctrl-c exits at once
    #[arg(long, env = "PAIRLOAD_GRACE", default_value = "5", value_parser = parse_interval)]
    pub grace: Duration,
    /// Stop after this many orders
    #[arg(long, env = "PAIRLOAD_MAX_ORDERS")]
    pub max_orders: Option<u64>,
    /// Attempts of each transaction, the first one included
    #[arg(
        long,
        env = "PAIRLOAD_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,
    #[arg(long, env = "PAIRLOAD_BASE_DELAY_MS", default_value_t = 100)]
    pub base_delay_ms: u64,
    #[arg(long, env = "PAIRLOAD_JITTER_MS", default_value_t = 100)]
    pub jitter_ms: u64,
    #[arg(long, env = "PAIRLOAD_ACCOUNT_ID", default_value_t = 1)]
    pub account_id: i64,
    #[arg(long, env = "PAIRLOAD_SYMBOL", default_value = "ORCL")]
    pub symbol: String,
    #[arg(long, env = "PAIRLOAD_ORDERS_TABLE", default_value = "orders")]
    pub orders_table: String,
    #[arg(long, env = "PAIRLOAD_FILLS_TABLE", default_value = "order_fills")]
    pub fills_table: String,
    /// Drop and recreate the tables before starting
    #[arg(long, env = "PAIRLOAD_CREATE_SCHEMA")]
    pub create_schema: bool,
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let seconds = value
        .parse::<f64>()
        .map_err(|e| format!("`{}` is not a number of seconds: {}", value, e))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("`{}` is not a valid interval: {}", value, e))
}

impl From<Args> for WorkloadConfig {
    fn from(args: Args) -> Self {
        WorkloadConfig {
            url: args.url,
            interval: args.interval,
            max_orders: args.max_orders,
            grace: args.grace,
            account_id: args.account_id,
            symbol: args.symbol,
            shares: 50..=200,
            cost: Decimal::new(100_00, 2)..=Decimal::new(500_00, 2),
            retry: RetryPolicy::default()
                .with_max_attempts(args.max_attempts)
                .with_base_delay(Duration::from_millis(args.base_delay_ms))
                .with_jitter(Duration::from_millis(args.jitter_ms)),
            tables: TableNames {
                orders: args.orders_table,
                fills: args.fills_table,
            },
            create_schema: args.create_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        assert_eq!(parse_interval("1"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_interval("0.25"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_interval("0"), Ok(Duration::ZERO));
        assert!(parse_interval("-1").is_err());
        assert!(parse_interval("soon").is_err());
    }
}
