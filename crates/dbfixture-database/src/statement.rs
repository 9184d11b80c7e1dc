//! SQL text for the statements the framework issues

use crate::connection::Connection;

fn column_list<C: Connection + ?Sized, S: AsRef<str>>(conn: &C, columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| conn.quote_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn conditions<C: Connection + ?Sized, S: AsRef<str>>(conn: &C, columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| format!("{} = ?", conn.quote_identifier(c.as_ref())))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Builder for a single-table SELECT
pub(crate) struct Select<'a, C: ?Sized, S> {
    conn: &'a C,
    table: &'a str,
    columns: &'a [S],
    distinct: bool,
    filter: &'a [S],
    order_by: &'a [S],
}

impl<'a, C: Connection + ?Sized, S: AsRef<str>> Select<'a, C, S> {
    pub(crate) fn new(conn: &'a C, table: &'a str, columns: &'a [S]) -> Self {
        Self {
            conn,
            table,
            columns,
            distinct: false,
            filter: &[],
            order_by: &[],
        }
    }

    pub(crate) fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `column = ?` for each column, joined with AND
    pub(crate) fn filter(mut self, columns: &'a [S]) -> Self {
        self.filter = columns;
        self
    }

    pub(crate) fn order_by(mut self, columns: &'a [S]) -> Self {
        self.order_by = columns;
        self
    }

    pub(crate) fn sql(&self) -> String {
        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if self.distinct { "DISTINCT " } else { "" },
            column_list(self.conn, self.columns),
            self.conn.quote_identifier(self.table)
        );
        if !self.filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions(self.conn, self.filter));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&column_list(self.conn, self.order_by));
        }
        sql
    }
}

/// Multi-row INSERT with `rows` value tuples
pub(crate) fn insert<C: Connection + ?Sized, S: AsRef<str>>(
    conn: &C,
    table: &str,
    columns: &[S],
    rows: usize,
) -> String {
    let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        conn.quote_identifier(table),
        column_list(conn, columns),
        vec![tuple; rows].join(", ")
    )
}

pub(crate) fn update<C: Connection + ?Sized, S: AsRef<str>>(
    conn: &C,
    table: &str,
    set: &[S],
    key: &[S],
) -> String {
    format!(
        "UPDATE {} SET {} WHERE {}",
        conn.quote_identifier(table),
        set.iter()
            .map(|c| format!("{} = ?", conn.quote_identifier(c.as_ref())))
            .collect::<Vec<_>>()
            .join(", "),
        conditions(conn, key)
    )
}

pub(crate) fn delete<C: Connection + ?Sized, S: AsRef<str>>(conn: &C, table: &str, key: &[S]) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        conn.quote_identifier(table),
        conditions(conn, key)
    )
}

pub(crate) fn delete_all<C: Connection + ?Sized>(conn: &C, table: &str) -> String {
    format!("DELETE FROM {}", conn.quote_identifier(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteConnection;
    use dbfixture_core::FixtureConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statement_text() {
        let conn = SqliteConnection::open_in_memory(&FixtureConfig::default()).unwrap();
        let key = ["id".to_string()];
        let columns = ["id".to_string(), "na\"me".to_string()];

        assert_eq!(
            Select::new(&conn, "t", &columns).filter(&key).order_by(&key).sql(),
            r#"SELECT "id", "na""me" FROM "t" WHERE "id" = ? ORDER BY "id""#
        );
        assert_eq!(
            Select::new(&conn, "t", &key).distinct().sql(),
            r#"SELECT DISTINCT "id" FROM "t""#
        );
        assert_eq!(
            insert(&conn, "t", &columns, 2),
            r#"INSERT INTO "t" ("id", "na""me") VALUES (?, ?), (?, ?)"#
        );
        assert_eq!(
            update(&conn, "t", &columns[1..], &key),
            r#"UPDATE "t" SET "na""me" = ? WHERE "id" = ?"#
        );
        assert_eq!(delete(&conn, "t", &key), r#"DELETE FROM "t" WHERE "id" = ?"#);
    }
}
