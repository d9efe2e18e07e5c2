use crate::write_identifier;
use std::fmt::Write;

/// Names of the two tables the workload writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub orders: String,
    pub fills: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            orders: "orders".into(),
            fills: "order_fills".into(),
        }
    }
}

/// How the identity of the order just inserted is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// The insert carries a `RETURNING` clause.
    Returning,
    /// A separate query, run in the same transaction right after the insert,
    /// returns the identity generated by the session.
    LastInsertQuery,
}

/// Dialect specific sql generation.
///
/// The default implementations write portable sql with `?` placeholders,
/// drivers override what their backend does differently.
pub trait SqlWriter: Send + Sync {
    fn identity_strategy(&self) -> IdentityStrategy {
        IdentityStrategy::Returning
    }

    /// Write the placeholder of the parameter at `index` (from 0).
    fn write_placeholder(&self, out: &mut String, _index: usize) {
        out.push('?');
    }

    fn write_current_timestamp(&self, out: &mut String) {
        out.push_str("CURRENT_TIMESTAMP");
    }

    fn write_insert_order(&self, out: &mut String, tables: &TableNames) {
        out.push_str("INSERT INTO ");
        write_identifier(out, &tables.orders);
        out.push_str(
            " (account_id, symbol, order_started, total_shares_purchased, total_cost_of_order) VALUES (",
        );
        self.write_placeholder(out, 0);
        out.push_str(", ");
        self.write_placeholder(out, 1);
        out.push_str(", ");
        self.write_current_timestamp(out);
        out.push_str(", ");
        self.write_placeholder(out, 2);
        out.push_str(", ");
        self.write_placeholder(out, 3);
        out.push(')');
        if self.identity_strategy() == IdentityStrategy::Returning {
            out.push_str(" RETURNING order_id");
        }
    }

    /// Query returning the identity generated by the last insert of the
    /// session, used with [`IdentityStrategy::LastInsertQuery`].
    fn write_last_identity(&self, out: &mut String, tables: &TableNames);

    fn write_insert_fill(&self, out: &mut String, tables: &TableNames) {
        out.push_str("INSERT INTO ");
        write_identifier(out, &tables.fills);
        out.push_str(
            " (order_id, account_id, symbol, fill_time, shares_filled, total_cost_of_fill, price_at_time_of_fill) VALUES (",
        );
        self.write_placeholder(out, 0);
        out.push_str(", ");
        self.write_placeholder(out, 1);
        out.push_str(", ");
        self.write_placeholder(out, 2);
        out.push_str(", ");
        self.write_current_timestamp(out);
        for i in 3..6 {
            out.push_str(", ");
            self.write_placeholder(out, i);
        }
        out.push(')');
    }

    fn write_count(&self, out: &mut String, table: &str) {
        out.push_str("SELECT COUNT(*) FROM ");
        write_identifier(out, table);
    }

    /// Schema creation, one statement for each entry.
    fn write_create_schema(&self, tables: &TableNames) -> Vec<String>;

    fn write_drop_schema(&self, tables: &TableNames) -> Vec<String> {
        [&tables.fills, &tables.orders]
            .into_iter()
            .map(|table| {
                let mut out = String::new();
                out.push_str("DROP TABLE IF EXISTS ");
                write_identifier(&mut out, table);
                out
            })
            .collect()
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK");
    }
}

/// Writes `$1`, `$2`, ... placeholders numbered from 1.
pub fn write_numbered_placeholder(out: &mut String, index: usize) {
    let _ = write!(out, "${}", index + 1);
}
