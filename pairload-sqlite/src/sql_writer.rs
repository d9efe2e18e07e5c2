use indoc::formatdoc;
use pairload_core::{IdentityStrategy, SqlWriter, TableNames, write_identifier};

/// Sqlite dialect: `?` placeholders, rowid identities, decimals kept as text.
pub struct SqliteSqlWriter {}

fn quoted(name: &str) -> String {
    let mut out = String::new();
    write_identifier(&mut out, name);
    out
}

impl SqlWriter for SqliteSqlWriter {
    fn identity_strategy(&self) -> IdentityStrategy {
        IdentityStrategy::LastInsertQuery
    }

    fn write_last_identity(&self, out: &mut String, _tables: &TableNames) {
        out.push_str("SELECT last_insert_rowid()");
    }

    fn write_create_schema(&self, tables: &TableNames) -> Vec<String> {
        let orders = quoted(&tables.orders);
        let fills = quoted(&tables.fills);
        vec![
            formatdoc! {"
                CREATE TABLE IF NOT EXISTS {orders} (
                    order_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    account_id INTEGER NOT NULL,
                    symbol TEXT NOT NULL,
                    order_started TEXT NOT NULL,
                    total_shares_purchased INTEGER NOT NULL,
                    total_cost_of_order TEXT NOT NULL
                )"
            },
            formatdoc! {"
                CREATE TABLE IF NOT EXISTS {fills} (
                    fill_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    order_id INTEGER NOT NULL REFERENCES {orders} (order_id),
                    account_id INTEGER NOT NULL,
                    symbol TEXT NOT NULL,
                    fill_time TEXT NOT NULL,
                    shares_filled INTEGER NOT NULL,
                    total_cost_of_fill TEXT NOT NULL,
                    price_at_time_of_fill TEXT NOT NULL
                )"
            },
        ]
    }

    /// Takes the write lock upfront, a conflicting writer fails at `BEGIN`.
    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN IMMEDIATE");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_order() {
        let mut out = String::new();
        SqliteSqlWriter {}.write_insert_order(&mut out, &TableNames::default());
        assert_eq!(
            out,
            "INSERT INTO \"orders\" (account_id, symbol, order_started, total_shares_purchased, total_cost_of_order) \
             VALUES (?, ?, CURRENT_TIMESTAMP, ?, ?)"
        );
    }

    #[test]
    fn schema_references_orders() {
        let tables = TableNames {
            orders: "o".into(),
            fills: "f".into(),
        };
        let schema = SqliteSqlWriter {}.write_create_schema(&tables);
        assert_eq!(schema.len(), 2);
        assert!(schema[0].starts_with("CREATE TABLE IF NOT EXISTS \"o\" (\n"));
        assert!(schema[1].contains("order_id INTEGER NOT NULL REFERENCES \"o\" (order_id)"));
    }
}
