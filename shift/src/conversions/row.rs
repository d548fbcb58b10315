//! Decoding of Postgres rows into [`Cell`] values.

use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

use crate::error::{ErrorKind, ShiftResult};
use crate::shift_error;
use crate::types::{ArrayCell, Cell};

/// Binary payload of a value whose type has no dedicated [`Cell`] variant.
struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn get<'a, T>(row: &'a Row, index: usize) -> ShiftResult<Option<T>>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index).map_err(|err| {
        let column = &row.columns()[index];
        shift_error!(
            ErrorKind::ConversionError,
            "Failed to decode a column value",
            format!("column `{}` of type {}", column.name(), column.type_()),
            source: err
        )
    })
}

fn cell<'a, T>(row: &'a Row, index: usize, wrap: impl FnOnce(T) -> Cell) -> ShiftResult<Cell>
where
    T: FromSql<'a>,
{
    Ok(get::<T>(row, index)?.map(wrap).unwrap_or(Cell::Null))
}

fn array<'a, T>(
    row: &'a Row,
    index: usize,
    wrap: impl FnOnce(Vec<Option<T>>) -> ArrayCell,
) -> ShiftResult<Cell>
where
    T: FromSql<'a>,
{
    Ok(get::<Vec<Option<T>>>(row, index)?
        .map(|values| Cell::Array(wrap(values)))
        .unwrap_or(Cell::Null))
}

/// Decodes column `index` of `row` according to its Postgres type.
pub fn decode_cell(row: &Row, index: usize) -> ShiftResult<Cell> {
    let ty = row.columns()[index].type_().clone();

    match ty {
        Type::BOOL => cell(row, index, Cell::Bool),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => cell(row, index, Cell::String),
        Type::INT2 => cell(row, index, Cell::I16),
        Type::INT4 => cell(row, index, Cell::I32),
        Type::OID => cell(row, index, Cell::U32),
        Type::INT8 => cell(row, index, Cell::I64),
        Type::FLOAT4 => cell(row, index, Cell::F32),
        Type::FLOAT8 => cell(row, index, Cell::F64),
        Type::DATE => cell::<NaiveDate>(row, index, Cell::Date),
        Type::TIME => cell::<NaiveTime>(row, index, Cell::Time),
        Type::TIMESTAMP => cell::<NaiveDateTime>(row, index, Cell::Timestamp),
        Type::TIMESTAMPTZ => cell::<DateTime<Utc>>(row, index, Cell::TimestampTz),
        Type::UUID => cell::<Uuid>(row, index, Cell::Uuid),
        Type::JSON | Type::JSONB => cell(row, index, Cell::Json),
        Type::BYTEA => cell(row, index, Cell::Bytes),
        Type::BOOL_ARRAY => array(row, index, ArrayCell::Bool),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => {
            array(row, index, ArrayCell::String)
        }
        Type::INT2_ARRAY => array(row, index, ArrayCell::I16),
        Type::INT4_ARRAY => array(row, index, ArrayCell::I32),
        Type::OID_ARRAY => array(row, index, ArrayCell::U32),
        Type::INT8_ARRAY => array(row, index, ArrayCell::I64),
        Type::FLOAT4_ARRAY => array(row, index, ArrayCell::F32),
        Type::FLOAT8_ARRAY => array(row, index, ArrayCell::F64),
        Type::DATE_ARRAY => array(row, index, ArrayCell::Date),
        Type::TIME_ARRAY => array(row, index, ArrayCell::Time),
        Type::TIMESTAMP_ARRAY => array(row, index, ArrayCell::Timestamp),
        Type::TIMESTAMPTZ_ARRAY => array(row, index, ArrayCell::TimestampTz),
        Type::UUID_ARRAY => array(row, index, ArrayCell::Uuid),
        Type::JSON_ARRAY | Type::JSONB_ARRAY => array(row, index, ArrayCell::Json),
        Type::BYTEA_ARRAY => array(row, index, ArrayCell::Bytes),
        ty => Ok(get::<RawValue>(row, index)?
            .map(|raw| Cell::Raw { ty, bytes: raw.0 })
            .unwrap_or(Cell::Null)),
    }
}

/// Decodes every column of `row`, in result set order.
pub fn decode_row(row: &Row) -> ShiftResult<Vec<Cell>> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}
