use indoc::formatdoc;
use pairload_core::{SqlWriter, TableNames, write_identifier, write_numbered_placeholder};

/// Postgres dialect, also understood by CockroachDB.
pub struct PostgresSqlWriter {}

fn quoted(name: &str) -> String {
    let mut out = String::new();
    write_identifier(&mut out, name);
    out
}

impl SqlWriter for PostgresSqlWriter {
    fn write_placeholder(&self, out: &mut String, index: usize) {
        write_numbered_placeholder(out, index);
    }

    fn write_current_timestamp(&self, out: &mut String) {
        out.push_str("NOW()");
    }

    fn write_last_identity(&self, out: &mut String, _tables: &TableNames) {
        out.push_str("SELECT lastval()");
    }

    fn write_create_schema(&self, tables: &TableNames) -> Vec<String> {
        let orders = quoted(&tables.orders);
        let fills = quoted(&tables.fills);
        vec![
            formatdoc! {"
                CREATE TABLE IF NOT EXISTS {orders} (
                    order_id BIGSERIAL PRIMARY KEY,
                    account_id BIGINT NOT NULL,
                    symbol VARCHAR(16) NOT NULL,
                    order_started TIMESTAMPTZ NOT NULL,
                    total_shares_purchased INTEGER NOT NULL,
                    total_cost_of_order NUMERIC(12, 2) NOT NULL
                )"
            },
            formatdoc! {"
                CREATE TABLE IF NOT EXISTS {fills} (
                    fill_id BIGSERIAL PRIMARY KEY,
                    order_id BIGINT NOT NULL REFERENCES {orders} (order_id),
                    account_id BIGINT NOT NULL,
                    symbol VARCHAR(16) NOT NULL,
                    fill_time TIMESTAMPTZ NOT NULL,
                    shares_filled INTEGER NOT NULL,
                    total_cost_of_fill NUMERIC(12, 2) NOT NULL,
                    price_at_time_of_fill NUMERIC(12, 2) NOT NULL
                )"
            },
        ]
    }
}
