use pairload_core::{
    Connection, Driver, OrderStore, RandomOrders, RetryPolicy, RunReport, TableNames, Workload,
    WorkloadError,
};
use pairload_postgres::PostgresConnection;
use pairload_sqlite::{SqliteConnection, SqliteDriver};
use rust_decimal::Decimal;
use std::{future::Future, ops::RangeInclusive, time::Duration};

/// Backend selected by the scheme of the connection url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        match scheme {
            "postgres" | "postgresql" => Some(Backend::Postgres),
            s if s == SqliteDriver::NAME => Some(Backend::Sqlite),
            _ => None,
        }
    }
}

/// Everything a run needs, passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub url: String,
    pub interval: Duration,
    pub max_orders: Option<u64>,
    /// Time left to the order in flight after the shutdown signal.
    pub grace: Duration,
    pub account_id: i64,
    pub symbol: String,
    pub shares: RangeInclusive<u32>,
    pub cost: RangeInclusive<Decimal>,
    pub retry: RetryPolicy,
    pub tables: TableNames,
    /// Drop and recreate the tables before the run.
    pub create_schema: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            interval: Duration::from_secs(1),
            max_orders: None,
            grace: Duration::from_secs(5),
            account_id: 1,
            symbol: "ORCL".into(),
            shares: 50..=200,
            cost: Decimal::new(100_00, 2)..=Decimal::new(500_00, 2),
            retry: RetryPolicy::default(),
            tables: TableNames::default(),
            create_schema: false,
        }
    }
}

impl WorkloadConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn workload(&self) -> Workload {
        Workload {
            interval: self.interval,
            max_orders: self.max_orders,
            grace: self.grace,
        }
    }

    /// Fails with [`WorkloadError::InvalidRequest`] on empty or non positive ranges.
    pub fn orders(&self) -> Result<RandomOrders, WorkloadError> {
        RandomOrders::new(self.account_id, self.symbol.clone())
            .with_shares(self.shares.clone())?
            .with_cost(*self.cost.start(), *self.cost.end())
    }

    pub fn backend(&self) -> Result<Backend, WorkloadError> {
        Backend::from_url(&self.url).ok_or_else(|| {
            WorkloadError::connectivity(
                self.url.clone(),
                pairload_core::Error::msg(
                    "Unsupported url scheme, expected one of: postgres, postgresql, sqlite",
                ),
            )
        })
    }

    /// Connect to the configured database and run the workload until it
    /// completes, fails or `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<RunReport, WorkloadError>
    where
        F: Future<Output = ()>,
    {
        match self.backend()? {
            Backend::Postgres => self.run_with::<PostgresConnection, F>(shutdown).await,
            Backend::Sqlite => self.run_with::<SqliteConnection, F>(shutdown).await,
        }
    }

    pub async fn run_with<C, F>(&self, shutdown: F) -> Result<RunReport, WorkloadError>
    where
        C: Connection,
        F: Future<Output = ()>,
    {
        log::info!(
            "Starting a {} workload every {:?}{}",
            <C::Driver as Driver>::NAME,
            self.interval,
            self.max_orders
                .map(|n| format!(", at most {} orders", n))
                .unwrap_or_default()
        );
        let orders = self.orders()?;
        let mut store =
            OrderStore::<C>::open(self.url.clone(), self.tables.clone(), self.retry.clone())
                .await?;
        if self.create_schema
            && let Err(e) = store.create_schema(true).await
        {
            if let Err(e) = store.close().await {
                log::error!("Could not close the connection: {:#}", e);
            }
            return Err(e);
        }
        Ok(self.workload().run(store, orders, shutdown).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_from_url() {
        assert_eq!(
            Backend::from_url("postgres://localhost/db"),
            Some(Backend::Postgres)
        );
        assert_eq!(
            Backend::from_url("postgresql://localhost/db"),
            Some(Backend::Postgres)
        );
        assert_eq!(
            Backend::from_url("sqlite://orders.sqlite"),
            Some(Backend::Sqlite)
        );
        assert_eq!(Backend::from_url("mysql://localhost/db"), None);
        assert_eq!(Backend::from_url("orders.sqlite"), None);
    }

    #[test]
    fn unsupported_scheme() {
        let config = WorkloadConfig::new("duckdb://memory");
        assert!(matches!(
            config.backend(),
            Err(WorkloadError::Connectivity { .. })
        ));
    }

    #[test]
    fn invalid_ranges() {
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = 5..=3;
        let config = WorkloadConfig {
            shares: inverted,
            ..WorkloadConfig::new("sqlite://orders.sqlite")
        };
        assert!(matches!(
            config.orders(),
            Err(WorkloadError::InvalidRequest(..))
        ));
        let config = WorkloadConfig {
            cost: Decimal::new(10_00, 2)..=Decimal::new(1_00, 2),
            ..WorkloadConfig::new("sqlite://orders.sqlite")
        };
        assert!(config.orders().is_err());
    }

    #[test]
    fn orders_follow_config() {
        let config = WorkloadConfig {
            account_id: 9,
            symbol: "MSFT".into(),
            shares: 5..=5,
            ..WorkloadConfig::new("sqlite://orders.sqlite")
        };
        for order in config.orders().expect("Valid ranges").take(20) {
            assert_eq!(order.account_id, 9);
            assert_eq!(order.symbol, "MSFT");
            assert_eq!(order.shares, 5);
            assert!(order.cost >= Decimal::new(100_00, 2));
            assert!(order.cost <= Decimal::new(500_00, 2));
        }
    }
}
