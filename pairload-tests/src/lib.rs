mod fault;
mod paired;
mod retry;
mod workload;

pub use fault::*;
use log::LevelFilter;
use pairload_core::{
    AsValue, Connection, Driver, Executor, RetryPolicy, SqlWriter, TableNames, create_schema,
    write_identifier,
};
use std::{borrow::Cow, env, sync::LazyLock, time::Duration};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        let result = { $($code)+ };
        log::set_max_level(level);
        result
    }};
}

/// Tables used by the suite, distinct from the default ones.
pub fn tables() -> TableNames {
    TableNames {
        orders: "pairload_orders".into(),
        fills: "pairload_order_fills".into(),
    }
}

/// Same attempts as the default policy, with short waits.
pub fn policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_base_delay(Duration::from_millis(5))
        .with_jitter(Duration::from_millis(5))
}

pub async fn connect<C: Connection>(url: &Cow<'static, str>) -> C {
    C::connect(url.clone())
        .await
        .expect("Could not connect to the database")
}

/// Rows of `table` read with a fresh count query.
pub async fn count_rows<E: Executor>(executor: &mut E, table: &str) -> u64 {
    let mut sql = String::new();
    executor.driver().sql_writer().write_count(&mut sql, table);
    let value = executor
        .fetch_scalar(sql.into())
        .await
        .expect("Failed to count the rows")
        .expect("The count query returned no row");
    u64::try_from_value(value).expect("The count is not an unsigned integer")
}

pub(crate) fn select_from(columns: &str, table: &str, writer: &impl SqlWriter) -> String {
    let mut sql = format!("SELECT {} FROM ", columns);
    write_identifier(&mut sql, table);
    sql.push_str(" WHERE order_id = ");
    writer.write_placeholder(&mut sql, 0);
    sql
}

/// Run the whole suite against the database at `url`.
///
/// The suite drops and recreates the tables returned by [`tables`].
pub async fn execute_tests<C: Connection>(url: &str) {
    let _lock = MUTEX.lock().await;
    let url: Cow<'static, str> = url.to_owned().into();

    let mut connection = connect::<C>(&url).await;
    create_schema(&mut connection, &tables(), true)
        .await
        .expect("Failed to create the tables");
    connection
        .disconnect()
        .await
        .expect("Failed to disconnect");

    paired::single_pair::<C>(&url).await;
    paired::many_pairs::<C>(&url).await;
    retry::retry_once::<C>(&url).await;
    retry::retry_every_step::<C>(&url).await;
    retry::retries_exhausted::<C>(&url).await;
    retry::single_attempt::<C>(&url).await;
    retry::injected_fatal::<C>(&url).await;
    retry::missing_table::<C>(&url).await;
    workload::workload_completed::<C>(&url).await;
    workload::workload_interrupted::<C>(&url).await;
    workload::workload_failed::<C>(&url).await;
}
