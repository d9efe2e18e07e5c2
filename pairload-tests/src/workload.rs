use crate::{FaultPoint, FaultyConnection, connect, policy, silent_logs, tables};
use pairload_core::{
    Connection, ErrorClass, OrderStore, RandomOrders, StopReason, Workload, WorkloadError,
};
use std::{borrow::Cow, future, time::Duration};
use tokio::time::sleep;

pub async fn workload_completed<C: Connection>(url: &Cow<'static, str>) {
    let store = OrderStore::<C>::open(url.clone(), tables(), policy())
        .await
        .expect("Could not open the store");
    let workload = Workload {
        interval: Duration::from_millis(5),
        max_orders: Some(5),
        ..Default::default()
    };
    let report = workload
        .run(store, RandomOrders::default().with_seed(11), future::pending())
        .await;
    assert!(report.is_success());
    assert!(matches!(report.stop, StopReason::Completed));
    assert_eq!(report.inserted, 5);
    let initial = report.initial.expect("Missing initial counts");
    let last = report.last.expect("Missing final counts");
    assert_eq!(last.orders - initial.orders, 5);
    assert_eq!(last.fills - initial.fills, 5);
}

pub async fn workload_interrupted<C: Connection>(url: &Cow<'static, str>) {
    let store = OrderStore::<C>::open(url.clone(), tables(), policy())
        .await
        .expect("Could not open the store");
    let workload = Workload {
        interval: Duration::from_millis(30),
        max_orders: None,
        ..Default::default()
    };
    let report = workload
        .run(
            store,
            RandomOrders::default(),
            sleep(Duration::from_millis(100)),
        )
        .await;
    assert!(matches!(report.stop, StopReason::Interrupted));
    assert!(report.inserted >= 1);
    let initial = report.initial.expect("Missing initial counts");
    let last = report.last.expect("Missing final counts");
    assert_eq!(last.orders - initial.orders, report.inserted);
    assert_eq!(last.fills - initial.fills, report.inserted);

    // Nothing is left locked by the interrupted run
    let mut store = OrderStore::<C>::open(url.clone(), tables(), policy())
        .await
        .expect("Could not open the store");
    store
        .insert(&RandomOrders::default().next().expect("Endless orders"))
        .await
        .expect("Failed to insert after the interrupted run");
    let counts = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(counts.orders, last.orders + 1);
    assert_eq!(counts.fills, last.fills + 1);
    store.close().await.expect("Failed to close the store");
}

pub async fn workload_failed<C: Connection>(url: &Cow<'static, str>) {
    let tables = tables();
    let mut connection = FaultyConnection::new(connect::<C>(url).await, &tables);
    connection.fail_at(3, FaultPoint::OrderInsert, ErrorClass::Fatal);
    let store = OrderStore::new(connection, tables, policy());
    let workload = Workload {
        interval: Duration::ZERO,
        max_orders: Some(10),
        ..Default::default()
    };
    let report = silent_logs! {
        workload
            .run(store, RandomOrders::default(), future::pending())
            .await
    };
    assert!(!report.is_success());
    assert!(
        matches!(
            report.stop,
            StopReason::Failed(WorkloadError::FatalDatabase { .. })
        ),
        "Unexpected stop {}",
        report.stop
    );
    assert_eq!(report.inserted, 2);
    let initial = report.initial.expect("Missing initial counts");
    let last = report.last.expect("Missing final counts");
    assert_eq!(last.orders - initial.orders, 2);
    assert_eq!(last.fills - initial.fills, 2);
}
