use crate::ValueHolder;
use pairload_core::{Error, Query, Result, Row, RowsAffected};
use postgres_types::ToSql;
use tokio_postgres::GenericClient;

fn holders(query: &Query) -> Vec<ValueHolder> {
    query.params.iter().cloned().map(ValueHolder).collect()
}

pub(crate) async fn execute<C: GenericClient + Sync>(
    client: &C,
    query: Query,
) -> Result<RowsAffected> {
    let holders = holders(&query);
    let params = holders
        .iter()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect::<Vec<_>>();
    client
        .execute(query.sql.as_str(), &params)
        .await
        .map_err(|e| Error::new(e).context(format!("While executing the query:\n{}", query)))
}

pub(crate) async fn fetch<C: GenericClient + Sync>(client: &C, query: Query) -> Result<Vec<Row>> {
    let holders = holders(&query);
    let params = holders
        .iter()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect::<Vec<_>>();
    let rows = client
        .query(query.sql.as_str(), &params)
        .await
        .map_err(|e| Error::new(e).context(format!("While fetching the query:\n{}", query)))?;
    rows.into_iter().map(decode_row).collect()
}

pub(crate) fn decode_row(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let col = &row.columns()[i];
                Err(Error::new(e).context(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect()
}
