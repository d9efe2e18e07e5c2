use crate::{
    AsValue, Connection, Driver, Executor, OrderId, OrderRequest, Query, Result, RetryPolicy,
    SqlWriter, TableNames, WorkloadError, insert_with_retry,
};
use rust_decimal::Decimal;
use std::{borrow::Cow, fmt};

/// Total rows of the two tables.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub orders: u64,
    pub fills: u64,
}

impl fmt::Display for RowCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Orders: {}, Fills: {}", self.orders, self.fills)
    }
}

/// Count the rows of both tables.
pub async fn get_counts<E: Executor>(
    executor: &mut E,
    tables: &TableNames,
) -> Result<RowCounts, WorkloadError> {
    let writer = executor.driver().sql_writer();
    let mut counts = [0u64; 2];
    for (count, table) in counts.iter_mut().zip([&tables.orders, &tables.fills]) {
        let mut sql = String::new();
        writer.write_count(&mut sql, table);
        let error = |source: crate::Error| WorkloadError::RowCount {
            table: table.clone(),
            source: source.into(),
        };
        *count = match executor.fetch_scalar(sql.into()).await.map_err(error)? {
            Some(value) => u64::try_from_value(value).map_err(error)?,
            None => 0,
        };
    }
    Ok(RowCounts {
        orders: counts[0],
        fills: counts[1],
    })
}

/// Create both tables, optionally dropping them first.
pub async fn create_schema<E: Executor>(
    executor: &mut E,
    tables: &TableNames,
    drop_first: bool,
) -> Result<()> {
    let writer = executor.driver().sql_writer();
    let mut statements = Vec::new();
    if drop_first {
        statements.extend(writer.write_drop_schema(tables));
    }
    statements.extend(writer.write_create_schema(tables));
    for sql in statements {
        executor.execute(Query::new(sql)).await?;
    }
    Ok(())
}

/// Caller facing handle: owns the connection and writes orders through the
/// retry policy.
pub struct OrderStore<C: Connection> {
    connection: C,
    pub tables: TableNames,
    pub policy: RetryPolicy,
}

impl<C: Connection> OrderStore<C> {
    pub fn new(connection: C, tables: TableNames, policy: RetryPolicy) -> Self {
        Self {
            connection,
            tables,
            policy,
        }
    }

    /// Connect to `url`. A failure here is a [`WorkloadError::Connectivity`].
    pub async fn open(
        url: impl Into<Cow<'static, str>>,
        tables: TableNames,
        policy: RetryPolicy,
    ) -> Result<Self, WorkloadError> {
        let url = url.into();
        log::debug!("Connecting to a {} database", <C::Driver as Driver>::NAME);
        match C::connect(url.clone()).await {
            Ok(connection) => Ok(Self::new(connection, tables, policy)),
            Err(e) => {
                log::error!("Error connecting to `{}`: {:#}", url, e);
                Err(WorkloadError::connectivity(url, e))
            }
        }
    }

    pub async fn insert_paired_record(
        &mut self,
        account_id: i64,
        symbol: &str,
        shares: u32,
        cost: Decimal,
    ) -> Result<OrderId, WorkloadError> {
        let order = OrderRequest::new(account_id, symbol, shares, cost)?;
        self.insert(&order).await
    }

    pub async fn insert(&mut self, order: &OrderRequest) -> Result<OrderId, WorkloadError> {
        insert_with_retry(&mut self.connection, &self.tables, &self.policy, order).await
    }

    pub async fn get_counts(&mut self) -> Result<RowCounts, WorkloadError> {
        get_counts(&mut self.connection, &self.tables).await
    }

    /// Create both tables, dropping them first when `drop_first`.
    pub async fn create_schema(&mut self, drop_first: bool) -> Result<(), WorkloadError> {
        create_schema(&mut self.connection, &self.tables, drop_first)
            .await
            .map_err(|e| {
                log::error!("{:#}", e);
                WorkloadError::Schema { source: e.into() }
            })
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.connection
    }

    pub async fn close(self) -> Result<()> {
        self.connection.disconnect().await
    }
}
