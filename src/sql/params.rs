//! Binding `Value`s to sqlx queries.

use crate::fields::{Value, TIMESTAMP_STORAGE_FORMAT};
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::Any;

pub type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Bind one value. Timestamps go over the wire as text in storage format, id sets as `1,2,3`.
pub fn bind_value<'q>(query: AnyQuery<'q>, v: &Value) -> AnyQuery<'q> {
    match v {
        Value::Null => query.bind(None::<String>),
        Value::Text(s) => query.bind(s.clone()),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Bool(b) => query.bind(*b),
        Value::Timestamp(t) => query.bind(t.format(TIMESTAMP_STORAGE_FORMAT).to_string()),
        Value::Ids(_) => query.bind(v.to_string()),
    }
}

pub fn bind_all<'q>(sql: &'q str, params: &[Value]) -> AnyQuery<'q> {
    params.iter().fold(sqlx::query(sql), bind_value)
}
