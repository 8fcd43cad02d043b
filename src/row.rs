//! Result rows as delivered by a [`Connection`](crate::source::Connection).

use serde_json::Value;

use crate::error::{ExtractError, Result};

/// One result row: column name to value, in result-set column order.
pub type Row = serde_json::Map<String, Value>;

/// Builds a row from `(column, value)` pairs.
pub fn row_from<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

pub(crate) fn field<'r>(row: &'r Row, column: &str) -> Result<&'r Value> {
    row.get(column)
        .ok_or_else(|| ExtractError::MissingColumn(column.to_string()))
}

/// Text value of a column. Non-string scalars are rendered as text.
pub(crate) fn text(row: &Row, column: &str) -> Result<String> {
    match field(row, column)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ExtractError::InvalidValue {
            column: column.to_string(),
            value: other.clone(),
        }),
    }
}

/// Like [`text`] but SQL NULL maps to `None`.
pub(crate) fn nullable_text(row: &Row, column: &str) -> Result<Option<String>> {
    match field(row, column)? {
        Value::Null => Ok(None),
        _ => text(row, column).map(Some),
    }
}

/// Integer value of a column. Drivers that fetch everything as text hand
/// numbers over as strings, so numeric strings are accepted.
pub(crate) fn integer(row: &Row, column: &str) -> Result<i64> {
    let value = field(row, column)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ExtractError::InvalidValue {
        column: column.to_string(),
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_keeps_column_order() {
        let row = row_from([("b", json!(1)), ("a", json!(2)), ("c", json!(3))]);
        let names: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn integer_accepts_numeric_text() {
        let row = row_from([("n", json!(" 7 ")), ("m", json!(3)), ("x", json!("seven"))]);
        assert_eq!(integer(&row, "n").unwrap(), 7);
        assert_eq!(integer(&row, "m").unwrap(), 3);
        assert!(matches!(
            integer(&row, "x"),
            Err(ExtractError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let row = row_from([("a", json!("x"))]);
        match text(&row, "b") {
            Err(ExtractError::MissingColumn(name)) => assert_eq!(name, "b"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nullable_text_maps_null_to_none() {
        let row = row_from([("d", Value::Null), ("e", json!("wiki"))]);
        assert_eq!(nullable_text(&row, "d").unwrap(), None);
        assert_eq!(nullable_text(&row, "e").unwrap(), Some("wiki".to_string()));
        assert!(text(&row, "d").is_err());
    }
}
