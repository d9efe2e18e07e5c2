use crate::{policy, select_from, tables};
use pairload_core::{AsValue, Connection, Driver, OrderStore, Query, RandomOrders, Value};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::borrow::Cow;

fn take<T: AsValue>(values: &mut impl Iterator<Item = Value>) -> T {
    T::try_from_value(values.next().expect("Missing column")).expect("Unexpected column value")
}

pub async fn single_pair<C: Connection>(url: &Cow<'static, str>) {
    let mut store = OrderStore::<C>::open(url.clone(), tables(), policy())
        .await
        .expect("Could not open the store");
    let before = store.get_counts().await.expect("Failed to read the counts");

    let order_id = store
        .insert_paired_record(7, "ORCL", 3, dec!(100.00))
        .await
        .expect("Failed to insert the paired record");

    let after = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(after.orders, before.orders + 1);
    assert_eq!(after.fills, before.fills + 1);

    let tables = store.tables.clone();
    let connection = store.connection();
    let writer = connection.driver().sql_writer();

    let sql = select_from(
        "account_id, symbol, total_shares_purchased, total_cost_of_order",
        &tables.orders,
        &writer,
    );
    let rows = connection
        .fetch(Query::new(sql).bind(order_id))
        .await
        .expect("Failed to read the order");
    assert_eq!(rows.len(), 1);
    let mut order = rows.into_iter().flat_map(|r| r.into_vec());
    assert_eq!(take::<i64>(&mut order), 7);
    assert_eq!(take::<String>(&mut order), "ORCL");
    assert_eq!(take::<u32>(&mut order), 3);
    assert_eq!(take::<Decimal>(&mut order), dec!(100.00));

    let sql = select_from(
        "order_id, account_id, symbol, shares_filled, total_cost_of_fill, price_at_time_of_fill",
        &tables.fills,
        &writer,
    );
    let rows = connection
        .fetch(Query::new(sql).bind(order_id))
        .await
        .expect("Failed to read the fill");
    assert_eq!(rows.len(), 1, "Exactly one fill references the order");
    let mut fill = rows.into_iter().flat_map(|r| r.into_vec());
    assert_eq!(take::<i64>(&mut fill), order_id);
    assert_eq!(take::<i64>(&mut fill), 7);
    assert_eq!(take::<String>(&mut fill), "ORCL");
    assert_eq!(take::<u32>(&mut fill), 3);
    assert_eq!(take::<Decimal>(&mut fill), dec!(100.00));
    assert_eq!(take::<Decimal>(&mut fill), dec!(33.33));

    store.close().await.expect("Failed to close the store");
}

pub async fn many_pairs<C: Connection>(url: &Cow<'static, str>) {
    let mut store = OrderStore::<C>::open(url.clone(), tables(), policy())
        .await
        .expect("Could not open the store");
    let before = store.get_counts().await.expect("Failed to read the counts");
    let orders = RandomOrders::default().with_seed(42).take(10);
    let mut ids = Vec::new();
    for order in orders {
        ids.push(store.insert(&order).await.expect("Failed to insert the order"));
    }
    assert!(
        ids.windows(2).all(|w| w[0] < w[1]),
        "Order ids must be increasing: {:?}",
        ids
    );
    let after = store.get_counts().await.expect("Failed to read the counts");
    assert_eq!(after.orders - before.orders, 10);
    assert_eq!(after.fills - before.fills, 10);
    store.close().await.expect("Failed to close the store");
}
