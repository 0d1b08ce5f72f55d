//! Row decoding into `Value`s without knowing column types up front.

use crate::error::AppError;
use crate::fields::Value;
use sqlx::any::AnyRow;
use sqlx::{Row, ValueRef};

/// Read the first `columns` cells of a row. Byte values are returned as text so that
/// drivers returning bytes and drivers returning text compare equal when diffing.
pub fn scan_row(columns: usize, row: &AnyRow) -> Result<Vec<Value>, AppError> {
    (0..columns).map(|i| scan_cell(row, i)).collect()
}

fn scan_cell(row: &AnyRow, i: usize) -> Result<Value, AppError> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(n) = row.try_get::<i64, _>(i) {
        return Ok(Value::Int(n));
    }
    if let Ok(n) = row.try_get::<f64, _>(i) {
        return Ok(Value::Float(n));
    }
    if let Ok(b) = row.try_get::<bool, _>(i) {
        return Ok(Value::Bool(b));
    }
    if let Ok(s) = row.try_get::<String, _>(i) {
        return Ok(Value::Text(s));
    }
    let bytes = row.try_get::<Vec<u8>, _>(i)?;
    Ok(Value::Text(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Scan a single integer column, e.g. `COUNT(*)` or a join-table id.
pub fn scan_i64(row: &AnyRow, i: usize) -> Result<i64, AppError> {
    match scan_cell(row, i)? {
        Value::Int(n) => Ok(n),
        Value::Float(f) => Ok(f as i64),
        other => other.as_int().ok_or_else(|| {
            AppError::Db(sqlx::Error::Decode(
                format!("expected an integer, got '{}'", other).into(),
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::connect;

    #[tokio::test]
    async fn scans_mixed_row() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let row = sqlx::query("SELECT 1, 2.5, 'x', NULL, X'6869'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let values = scan_row(5, &row).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Null,
                Value::from("hi"),
            ]
        );
        assert_eq!(scan_i64(&row, 0).unwrap(), 1);
        assert!(scan_i64(&row, 2).is_err());
    }
}
