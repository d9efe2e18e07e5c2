use crate::{
    AsValue, AttemptError, Connection, Driver, Executor, IdentityStrategy, OrderId, OrderRequest,
    Query, Result, SqlWriter, Step, TableNames, Transaction,
};

/// Insert the order and its fill in one transaction and return the order id.
///
/// A failure of any step rolls the transaction back before it is returned,
/// tagged with the step. Nothing is retried here.
pub async fn insert_pair<C: Connection>(
    connection: &mut C,
    tables: &TableNames,
    order: &OrderRequest,
) -> std::result::Result<OrderId, AttemptError> {
    let writer = connection.driver().sql_writer();
    let mut transaction = connection
        .begin()
        .await
        .map_err(|e| AttemptError::new(Step::Begin, e))?;
    match write_pair(&mut transaction, &writer, tables, order).await {
        Ok(order_id) => {
            transaction
                .commit()
                .await
                .map_err(|e| AttemptError::new(Step::Commit, e))?;
            Ok(order_id)
        }
        Err(failure) => {
            if let Err(e) = transaction.rollback().await {
                log::error!("Could not roll back after failing while {}: {:#}", failure.step, e);
            }
            Err(failure)
        }
    }
}

async fn write_pair<E: Executor, W: SqlWriter>(
    executor: &mut E,
    writer: &W,
    tables: &TableNames,
    order: &OrderRequest,
) -> std::result::Result<OrderId, AttemptError> {
    let mut sql = String::new();
    writer.write_insert_order(&mut sql, tables);
    let insert = Query::new(sql)
        .bind(order.account_id)
        .bind(order.symbol.as_str())
        .bind(order.shares)
        .bind(order.cost);
    let order_id = match writer.identity_strategy() {
        IdentityStrategy::Returning => fetch_order_id(executor, insert)
            .await
            .map_err(|e| AttemptError::new(Step::InsertOrder, e))?,
        IdentityStrategy::LastInsertQuery => {
            executor
                .execute(insert)
                .await
                .map_err(|e| AttemptError::new(Step::InsertOrder, e))?;
            let mut sql = String::new();
            writer.write_last_identity(&mut sql, tables);
            fetch_order_id(executor, sql.into())
                .await
                .map_err(|e| AttemptError::new(Step::FetchOrderId, e))?
        }
    };

    let mut sql = String::new();
    writer.write_insert_fill(&mut sql, tables);
    let insert = Query::new(sql)
        .bind(order_id)
        .bind(order.account_id)
        .bind(order.symbol.as_str())
        .bind(order.shares)
        .bind(order.cost)
        .bind(order.price());
    executor
        .execute(insert)
        .await
        .map_err(|e| AttemptError::new(Step::InsertFill, e))?;
    Ok(order_id)
}

async fn fetch_order_id<E: Executor>(executor: &mut E, query: Query) -> Result<OrderId> {
    let context = format!("While fetching the order id with:\n{}", query);
    match executor.fetch_scalar(query).await? {
        Some(value) if !value.is_null() => {
            OrderId::try_from_value(value).map_err(|e| e.context(context))
        }
        _ => Err(crate::Error::msg("No order id was returned").context(context)),
    }
}
