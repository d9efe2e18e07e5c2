#[cfg(test)]
mod tests {
    use pairload_core::{
        Connection, Driver, ErrorClass, Executor, OrderStore, RetryPolicy, Step, TableNames,
        Transaction, Value, WorkloadError, create_schema,
    };
    use pairload_sqlite::{SqliteConnection, SqliteDriver, SqliteError};
    use pairload_tests::{execute_tests, init_logs, silent_logs, tables};
    use rust_decimal_macros::dec;
    use std::{path::Path, time::Duration};
    use tempfile::TempDir;

    fn database_url(directory: &TempDir, name: &str, params: &str) -> String {
        format!(
            "sqlite://{}?{}",
            directory.path().join(name).display(),
            params
        )
    }

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        let directory = TempDir::new().expect("Failed to create a temporary directory");
        execute_tests::<SqliteConnection>(&database_url(&directory, "suite.sqlite", "mode=rwc"))
            .await;
    }

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let directory = TempDir::new().expect("Failed to create a temporary directory");
        let path = directory.path().join("creation.sqlite");
        let read_only = database_url(&directory, "creation.sqlite", "mode=ro");
        silent_logs! {
            assert!(
                SqliteConnection::connect(read_only.into())
                    .await
                    .is_err(),
                "Should not be able to open in read only a database that does not exist"
            );
        };
        assert!(!Path::new(&path).exists());
        SqliteConnection::connect(database_url(&directory, "creation.sqlite", "mode=rwc").into())
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(&path).exists(),
            "Database file should be created after connection"
        );
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("postgres://some_value".into())
                    .await
                    .is_err()
            );
            assert!(
                SqliteConnection::connect("sqlite://db.sqlite?mode=sometimes".into())
                    .await
                    .is_err()
            );
            let result = OrderStore::<SqliteConnection>::open(
                "sqlite:///definitely/not/a/directory/db.sqlite?mode=rw",
                tables(),
                RetryPolicy::default(),
            )
            .await;
            assert!(matches!(result, Err(WorkloadError::Connectivity { .. })));
        };
    }

    /// A writer holding the lock makes the other connection fail at `BEGIN`
    /// with `SQLITE_BUSY`, which the policy retries until the lock is gone.
    #[tokio::test]
    async fn busy_database() {
        init_logs();
        let directory = TempDir::new().expect("Failed to create a temporary directory");
        let url = database_url(&directory, "busy.sqlite", "mode=rwc&busy_timeout=0");
        let mut holder = SqliteConnection::connect(url.clone().into())
            .await
            .expect("Could not open the database");
        create_schema(&mut holder, &tables(), true)
            .await
            .expect("Failed to create the tables");

        let mut contender = SqliteConnection::connect(url.clone().into())
            .await
            .expect("Could not open the database");
        let transaction = holder.begin().await.expect("Could not begin a transaction");
        let error = match contender.begin().await {
            Ok(..) => panic!("The database should be locked"),
            Err(e) => e,
        };
        let sqlite = error
            .chain()
            .find_map(|e| e.downcast_ref::<SqliteError>())
            .expect("Expected a sqlite error");
        assert_eq!(sqlite.primary_code(), libsqlite3_sys::SQLITE_BUSY);
        assert_eq!(SqliteDriver::new().classify(&error), ErrorClass::Retryable);

        // Exhausted while the lock is held
        let mut store = OrderStore::new(
            contender,
            tables(),
            RetryPolicy::default()
                .with_base_delay(Duration::from_millis(1))
                .with_jitter(Duration::ZERO),
        );
        let result = silent_logs! {
            store.insert_paired_record(1, "ORCL", 10, dec!(100.00)).await
        };
        match result {
            Err(WorkloadError::RetriesExhausted { attempts: 3, last }) => {
                assert_eq!(last.step, Step::Begin)
            }
            other => panic!("Expected the retries to be exhausted, got {:?}", other),
        }

        // Released while the contender waits
        store.policy = RetryPolicy::default()
            .with_max_attempts(10)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(Duration::ZERO);
        let release = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            transaction
                .rollback()
                .await
                .expect("Failed to roll back the holder");
        };
        let ((), result) = tokio::join!(
            release,
            store.insert_paired_record(1, "ORCL", 10, dec!(100.00))
        );
        result.expect("The insert should succeed once the lock is released");
        let counts = store.get_counts().await.expect("Failed to read the counts");
        assert_eq!((counts.orders, counts.fills), (1, 1));
    }

    /// Dropping a transaction without finishing it releases the lock.
    #[tokio::test]
    async fn dropped_transaction() {
        let directory = TempDir::new().expect("Failed to create a temporary directory");
        let url = database_url(&directory, "dropped.sqlite", "mode=rwc");
        let mut first = SqliteConnection::connect(url.clone().into())
            .await
            .expect("Could not open the database");
        let mut second = SqliteConnection::connect(url.into())
            .await
            .expect("Could not open the database");
        {
            let mut transaction = first.begin().await.expect("Could not begin a transaction");
            transaction
                .execute("CREATE TABLE abandoned (id INTEGER)".into())
                .await
                .expect("Failed to create the table");
        }
        let transaction = second
            .begin()
            .await
            .expect("The lock should have been released");
        transaction.commit().await.expect("Failed to commit");
        let count = first
            .fetch_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'abandoned'".into())
            .await
            .expect("Failed to query the schema");
        assert_eq!(count, Some(Value::Int64(Some(0))));
    }

    /// Statements longer than the logged prefix, with multi byte names.
    #[tokio::test]
    async fn long_table_names() {
        init_logs();
        let directory = TempDir::new().expect("Failed to create a temporary directory");
        for padding in 0..2 {
            let url = database_url(&directory, &format!("names{}.sqlite", padding), "mode=rwc");
            let tables = TableNames {
                orders: format!("{}{}", "x".repeat(padding), "é".repeat(300)),
                fills: format!("{}{}", "y".repeat(padding), "ü".repeat(300)),
            };
            let mut store = OrderStore::<SqliteConnection>::open(url, tables, RetryPolicy::default())
                .await
                .expect("Could not open the store");
            store
                .create_schema(true)
                .await
                .expect("Failed to create the tables");
            store
                .insert_paired_record(1, "ORCL", 4, dec!(100.00))
                .await
                .expect("Failed to insert");
            let counts = store.get_counts().await.expect("Failed to read the counts");
            assert_eq!((counts.orders, counts.fills), (1, 1));
            store.close().await.expect("Failed to close the store");
        }
    }
}
