//! Drains query responses into materialized rows
//!
//! The reader fully consumes a response before returning so that an
//! error raised late in row iteration, or in the terminal status, never
//! yields a silently truncated result set.

use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use mysql_async::Conn;
use rust_decimal::Decimal;

use crate::error::{HarnessError, HarnessResult};
use crate::value::{ColumnKind, Row, Value};

/// Fully materialized result of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    /// Rows in the order the engine produced them.
    pub rows: Vec<Row>,
    /// Declared column types, one per column in declaration order.
    pub columns: Vec<ColumnKind>,
}

/// Execute `query` and drain its response completely.
///
/// Statements that produce no result set (DDL, DML) yield empty rows
/// and columns. A successful query with zero rows yields an empty vec;
/// there is no empty-vs-absent distinction.
pub async fn read_result(conn: &mut Conn, query: &str) -> HarnessResult<QueryOutput> {
    let mut result = conn.query_iter(query).await?;

    let columns = match result.columns() {
        Some(cols) => cols
            .iter()
            .map(|col| column_kind(col.column_type()))
            .collect::<HarnessResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    while let Some(row) = result.next().await? {
        rows.push(decode_row(row, &columns)?);
    }

    // Drain any trailing result sets so a late execution error surfaces.
    result.drop_result().await?;

    Ok(QueryOutput { rows, columns })
}

fn decode_row(mut row: mysql_async::Row, columns: &[ColumnKind]) -> HarnessResult<Row> {
    let mut values = Vec::with_capacity(columns.len());
    for (i, kind) in columns.iter().enumerate() {
        let raw: mysql_async::Value = row
            .take(i)
            .ok_or_else(|| HarnessError::Decode(format!("row is missing column {i}")))?;
        values.push(decode_value(raw, *kind)?);
    }
    Ok(values)
}

/// Map a wire column type onto the harness column identifiers.
fn column_kind(column_type: ColumnType) -> HarnessResult<ColumnKind> {
    use ColumnType::*;
    Ok(match column_type {
        MYSQL_TYPE_TINY => ColumnKind::Int8,
        MYSQL_TYPE_SHORT | MYSQL_TYPE_YEAR => ColumnKind::Int16,
        MYSQL_TYPE_LONG | MYSQL_TYPE_INT24 => ColumnKind::Int32,
        MYSQL_TYPE_LONGLONG => ColumnKind::Int64,
        MYSQL_TYPE_FLOAT => ColumnKind::Float32,
        MYSQL_TYPE_DOUBLE => ColumnKind::Float64,
        MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => ColumnKind::Decimal,
        MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING => ColumnKind::Text,
        MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB | MYSQL_TYPE_BLOB => {
            ColumnKind::Bytes
        }
        other => {
            return Err(HarnessError::Decode(format!(
                "unsupported column type {other:?}"
            )))
        }
    })
}

/// Convert one wire value under its column's declared type.
///
/// Text-protocol responses carry every scalar as raw bytes; binary
/// responses carry native variants. Both shapes are accepted.
fn decode_value(raw: mysql_async::Value, kind: ColumnKind) -> HarnessResult<Value> {
    use mysql_async::Value as Wire;

    if matches!(raw, Wire::NULL) {
        return Ok(Value::Null);
    }

    let unreadable = |raw: &Wire| HarnessError::Decode(format!("cannot read {kind:?} from {raw:?}"));

    Ok(match kind {
        ColumnKind::Int8 => {
            let n = as_i64(&raw).ok_or_else(|| unreadable(&raw))?;
            Value::Int8(i8::try_from(n).map_err(|_| {
                HarnessError::Decode(format!("value {n} out of range for TINYINT"))
            })?)
        }
        ColumnKind::Int16 => {
            let n = as_i64(&raw).ok_or_else(|| unreadable(&raw))?;
            Value::Int16(i16::try_from(n).map_err(|_| {
                HarnessError::Decode(format!("value {n} out of range for SMALLINT"))
            })?)
        }
        ColumnKind::Int32 => {
            let n = as_i64(&raw).ok_or_else(|| unreadable(&raw))?;
            Value::Int32(i32::try_from(n).map_err(|_| {
                HarnessError::Decode(format!("value {n} out of range for INT"))
            })?)
        }
        ColumnKind::Int64 => Value::Int64(as_i64(&raw).ok_or_else(|| unreadable(&raw))?),
        ColumnKind::Float32 => {
            let v = match &raw {
                Wire::Float(f) => Some(*f),
                Wire::Bytes(b) => parse_bytes::<f32>(b),
                _ => None,
            };
            Value::Float32(v.ok_or_else(|| unreadable(&raw))?)
        }
        ColumnKind::Float64 => {
            let v = match &raw {
                Wire::Double(d) => Some(*d),
                Wire::Float(f) => Some(f64::from(*f)),
                Wire::Bytes(b) => parse_bytes::<f64>(b),
                _ => None,
            };
            Value::Float64(v.ok_or_else(|| unreadable(&raw))?)
        }
        ColumnKind::Decimal => {
            let v = match &raw {
                Wire::Bytes(b) => parse_bytes::<Decimal>(b),
                Wire::Int(n) => Some(Decimal::from(*n)),
                _ => None,
            };
            Value::Decimal(v.ok_or_else(|| unreadable(&raw))?)
        }
        ColumnKind::Text => match raw {
            Wire::Bytes(b) => Value::Text(String::from_utf8(b).map_err(|e| {
                HarnessError::Decode(format!("TEXT column is not valid UTF-8: {e}"))
            })?),
            other => return Err(unreadable(&other)),
        },
        ColumnKind::Bytes => match raw {
            Wire::Bytes(b) => Value::Bytes(b),
            other => return Err(unreadable(&other)),
        },
    })
}

fn parse_bytes<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

fn as_i64(raw: &mysql_async::Value) -> Option<i64> {
    use mysql_async::Value as Wire;
    match raw {
        Wire::Int(n) => Some(*n),
        Wire::UInt(n) => i64::try_from(*n).ok(),
        Wire::Bytes(b) => parse_bytes(b),
        _ => None,
    }
}
