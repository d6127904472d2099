//! Renders the dialect-neutral [`Select`] into literal SQL text.

use compact_str::CompactString;

use crate::dialect::Dialect;
use crate::select::{ColumnRef, Predicate, ROW_NUMBER_COLUMN, Select, TableSource};

/// Stateless renderer for one [`Dialect`].
#[derive(Clone, Copy, Debug)]
pub struct SqlRenderer {
    dialect: Dialect,
}

impl SqlRenderer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn render(&self, select: &Select) -> CompactString {
        let mut sql = CompactString::with_capacity(256);

        sql.push_str("SELECT ");
        for (index, projection) in select.projections.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            write_qualified(&mut sql, &projection.source);
            sql.push_str(" AS ");
            write_ident(&mut sql, &projection.alias);
        }

        sql.push_str(" FROM ");
        write_source(&mut sql, &select.from);

        for join in &select.joins {
            sql.push_str(" LEFT OUTER JOIN ");
            write_source(&mut sql, &join.source);
            sql.push_str(" ON ");
            write_qualified(&mut sql, &join.on_left);
            sql.push_str(" = ");
            write_qualified(&mut sql, &join.on_right);
        }

        match select.predicate {
            Predicate::All => {}
            Predicate::ById => {
                sql.push_str(" WHERE ");
                write_qualified(&mut sql, &select.root_id);
                sql.push_str(" = ");
                sql.push_str(&self.dialect.placeholder(1));
            }
            Predicate::ByIds => {
                sql.push_str(" WHERE ");
                write_qualified(&mut sql, &select.root_id);
                match self.dialect {
                    Dialect::SQLite => {
                        sql.push_str(" IN (SELECT \"value\" FROM json_each(");
                        sql.push_str(&self.dialect.placeholder(1));
                        sql.push_str("))");
                    }
                    Dialect::PostgreSQL => {
                        sql.push_str(" = ANY(");
                        sql.push_str(&self.dialect.placeholder(1));
                        sql.push(')');
                    }
                }
            }
        }

        sql
    }
}

fn write_source(sql: &mut CompactString, source: &TableSource) {
    match &source.partition {
        None => write_ident(sql, &source.table),
        Some(spec) => {
            // row numbers are computed over the child table alone, before the
            // join, so rows duplicated by sibling flattening share a number
            sql.push_str("(SELECT ");
            write_ident(sql, &source.table);
            sql.push_str(".*, ROW_NUMBER() OVER (PARTITION BY ");
            write_ident(sql, &source.table);
            sql.push('.');
            write_ident(sql, &spec.partition_by);
            if let Some(order) = &spec.order_by {
                sql.push_str(" ORDER BY ");
                write_ident(sql, &source.table);
                sql.push('.');
                write_ident(sql, order);
            }
            sql.push_str(") AS ");
            write_ident(sql, ROW_NUMBER_COLUMN);
            sql.push_str(" FROM ");
            write_ident(sql, &source.table);
            sql.push(')');
        }
    }
    sql.push_str(" AS ");
    write_ident(sql, &source.alias);
}

fn write_qualified(sql: &mut CompactString, column: &ColumnRef) {
    write_ident(sql, &column.table);
    sql.push('.');
    write_ident(sql, &column.column);
}

fn write_ident(sql: &mut CompactString, name: &str) {
    sql.push('"');
    sql.push_str(name);
    sql.push('"');
}
