use rust_decimal::Decimal;

use crate::error::StoreError;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an optional column value.
pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Parse a string into an enum, returning CorruptRow on failure.
pub fn parse_enum<T: std::str::FromStr>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("unknown variant: {raw}"),
    })
}

/// Money columns are stored as decimal text; parse back losslessly.
pub fn get_decimal(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Decimal, StoreError> {
    let raw: String = get(row, idx, table, column)?;
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid decimal: {raw}"),
    })
}

/// Optional decimal text column. NULL maps to None.
pub fn get_decimal_opt(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<Decimal>, StoreError> {
    match get_opt::<String>(row, idx, table, column)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| StoreError::CorruptRow {
                table,
                column,
                detail: format!("invalid decimal: {raw}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kazi_core::task::TaskStatus;

    #[test]
    fn parse_enum_success() {
        let result: Result<TaskStatus, _> = parse_enum("in_progress", "tasks", "status");
        assert!(result.is_ok());
    }

    #[test]
    fn parse_enum_failure() {
        let result: Result<TaskStatus, _> = parse_enum("INVALID", "tasks", "status");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "tasks", column: "status", .. })
        ));
    }

    #[test]
    fn decimal_roundtrip_through_sqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (amount TEXT NOT NULL, maybe TEXT)").unwrap();
        conn.execute(
            "INSERT INTO t (amount, maybe) VALUES ('1234.56', NULL)",
            [],
        )
        .unwrap();

        conn.query_row("SELECT amount, maybe FROM t", [], |row| {
            let amount = get_decimal(row, 0, "t", "amount").unwrap();
            assert_eq!(amount, Decimal::new(123456, 2));
            let maybe = get_decimal_opt(row, 1, "t", "maybe").unwrap();
            assert!(maybe.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn bad_decimal_is_corrupt_row() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (amount TEXT NOT NULL)").unwrap();
        conn.execute("INSERT INTO t (amount) VALUES ('not-a-number')", []).unwrap();

        conn.query_row("SELECT amount FROM t", [], |row| {
            let result = get_decimal(row, 0, "t", "amount");
            assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
            Ok(())
        })
        .unwrap();
    }
}
