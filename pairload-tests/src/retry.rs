use crate::{FaultPoint, FaultyConnection, connect, count_rows, policy, silent_logs, tables};
use pairload_core::{
    Connection, ErrorClass, OrderStore, RetryPolicy, Step, TableNames, WorkloadError,
};
use rust_decimal_macros::dec;
use std::borrow::Cow;

async fn faulty_store<C: Connection>(
    url: &Cow<'static, str>,
) -> OrderStore<FaultyConnection<C>> {
    let tables = tables();
    let connection = FaultyConnection::new(connect::<C>(url).await, &tables);
    OrderStore::new(connection, tables, policy())
}

pub async fn retry_once<C: Connection>(url: &Cow<'static, str>) {
    let mut store = faulty_store::<C>(url).await;
    let before = store.get_counts().await.expect("Failed to read the counts");
    store
        .connection()
        .fail_at(1, FaultPoint::FillInsert, ErrorClass::Retryable);
    let order_id = store
        .insert_paired_record(1, "ORCL", 50, dec!(250.00))
        .await
        .expect("The second attempt should succeed");
    assert!(order_id > 0);
    assert_eq!(store.connection().begun(), 2);
    let after = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(after.orders, before.orders + 1);
    assert_eq!(after.fills, before.fills + 1);
    store.close().await.expect("Failed to close the store");
}

pub async fn retry_every_step<C: Connection>(url: &Cow<'static, str>) {
    let mut store = faulty_store::<C>(url).await;
    let before = store.get_counts().await.expect("Failed to read the counts");
    for (point, expected_begun) in [
        (FaultPoint::Begin, 2),
        (FaultPoint::OrderInsert, 2),
        (FaultPoint::Commit, 2),
    ] {
        let connection = store.connection();
        connection.reset();
        connection.fail_at(1, point, ErrorClass::Retryable);
        store
            .insert_paired_record(1, "ORCL", 120, dec!(480.00))
            .await
            .expect("The second attempt should succeed");
        assert_eq!(store.connection().begun(), expected_begun, "{:?}", point);
    }
    let after = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(after.orders, before.orders + 3);
    assert_eq!(after.fills, before.fills + 3);
    store.close().await.expect("Failed to close the store");
}

pub async fn retries_exhausted<C: Connection>(url: &Cow<'static, str>) {
    let mut store = faulty_store::<C>(url).await;
    let before = store.get_counts().await.expect("Failed to read the counts");
    store
        .connection()
        .fail_always(FaultPoint::FillInsert, ErrorClass::Retryable);
    let result = silent_logs! {
        store.insert_paired_record(1, "ORCL", 50, dec!(250.00)).await
    };
    let (attempts, last) = match result {
        Err(WorkloadError::RetriesExhausted { attempts, last }) => (attempts, last),
        other => panic!("Expected the retries to be exhausted, got {:?}", other),
    };
    assert_eq!(attempts, 3);
    assert_eq!(last.step, Step::InsertFill);
    assert_eq!(store.connection().begun(), 3);
    let after = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(after, before, "Nothing is persisted when every attempt fails");
    store.close().await.expect("Failed to close the store");
}

pub async fn single_attempt<C: Connection>(url: &Cow<'static, str>) {
    let mut store = faulty_store::<C>(url).await;
    store.policy = RetryPolicy::no_retry();
    store
        .connection()
        .fail_at(1, FaultPoint::Commit, ErrorClass::Retryable);
    let result = silent_logs! {
        store.insert_paired_record(1, "ORCL", 50, dec!(250.00)).await
    };
    assert!(matches!(
        result,
        Err(WorkloadError::RetriesExhausted { attempts: 1, .. })
    ));
    assert_eq!(store.connection().begun(), 1);
    store.close().await.expect("Failed to close the store");
}

pub async fn injected_fatal<C: Connection>(url: &Cow<'static, str>) {
    let mut store = faulty_store::<C>(url).await;
    let before = store.get_counts().await.expect("Failed to read the counts");
    store
        .connection()
        .fail_always(FaultPoint::FillInsert, ErrorClass::Fatal);
    let result = silent_logs! {
        store.insert_paired_record(1, "ORCL", 50, dec!(250.00)).await
    };
    assert!(
        matches!(
            result,
            Err(WorkloadError::FatalDatabase {
                step: Step::InsertFill,
                ..
            })
        ),
        "Unexpected result {:?}",
        result
    );
    assert_eq!(store.connection().begun(), 1, "Fatal errors are not retried");
    let after = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(after, before, "The order must be rolled back with its fill");
    store.close().await.expect("Failed to close the store");
}

/// Fills written to a table that does not exist fail for real, the order
/// inserted before must not survive.
pub async fn missing_table<C: Connection>(url: &Cow<'static, str>) {
    let tables = TableNames {
        fills: "pairload_missing_fills".into(),
        ..tables()
    };
    let mut store = OrderStore::<C>::open(url.clone(), tables.clone(), policy())
        .await
        .expect("Could not open the store");
    let before = count_rows(store.connection(), &tables.orders).await;
    let result = silent_logs! {
        store.insert_paired_record(1, "ORCL", 50, dec!(250.00)).await
    };
    assert!(
        matches!(
            result,
            Err(WorkloadError::FatalDatabase {
                step: Step::InsertFill,
                ..
            })
        ),
        "Unexpected result {:?}",
        result
    );
    assert_eq!(count_rows(store.connection(), &tables.orders).await, before);
    let result = silent_logs! { store.get_counts().await };
    assert!(matches!(result, Err(WorkloadError::RowCount { .. })));
    store.close().await.expect("Failed to close the store");
}
