use std::error::Error;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A single value read from a source row.
///
/// [`Cell`] is what flows from the source to the target. Values of types the crate knows are
/// decoded into their Rust representation; anything else is kept as the binary payload the
/// server sent in [`Cell::Raw`] and written back untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I16(i16),
    I32(i32),
    U32(u32),
    I64(i64),
    F32(f32),
    F64(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    Array(ArrayCell),
    /// Binary wire representation of a value of type `ty`.
    Raw { ty: Type, bytes: Vec<u8> },
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// A one-dimensional array value. `None` elements are SQL nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayCell {
    Bool(Vec<Option<bool>>),
    String(Vec<Option<String>>),
    I16(Vec<Option<i16>>),
    I32(Vec<Option<i32>>),
    U32(Vec<Option<u32>>),
    I64(Vec<Option<i64>>),
    F32(Vec<Option<f32>>),
    F64(Vec<Option<f64>>),
    Date(Vec<Option<NaiveDate>>),
    Time(Vec<Option<NaiveTime>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    TimestampTz(Vec<Option<DateTime<Utc>>>),
    Uuid(Vec<Option<Uuid>>),
    Json(Vec<Option<serde_json::Value>>),
    Bytes(Vec<Option<Vec<u8>>>),
}

fn narrow<T, V>(value: V, ty: &Type) -> Result<T, Box<dyn Error + Sync + Send>>
where
    T: TryFrom<V>,
    V: Copy + std::fmt::Display,
{
    T::try_from(value)
        .map_err(|_| format!("value {value} does not fit in a column of type {ty}").into())
}

/// Writes `value` in the binary `numeric` format: base 10 000 digits, most significant first,
/// without trailing zero digits.
fn numeric_from_integer(
    value: i64,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    let mut remaining = value.unsigned_abs();
    let mut digits = Vec::new();
    while remaining > 0 {
        digits.push((remaining % 10_000) as i16);
        remaining /= 10_000;
    }
    digits.reverse();

    let weight = digits.len().saturating_sub(1) as i16;
    while digits.last() == Some(&0) {
        digits.pop();
    }
    let sign: u16 = if value < 0 { 0x4000 } else { 0x0000 };

    out.put_i16(digits.len() as i16);
    out.put_i16(weight);
    out.put_u16(sign);
    // dscale
    out.put_u16(0);
    for digit in digits {
        out.put_i16(digit);
    }

    Ok(IsNull::No)
}

/// Writes an integer into whichever integer column it is bound to, failing only when the
/// value is out of range.
fn integer_to_sql(
    value: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => narrow::<i16, _>(value, ty)?.to_sql(ty, out),
        Type::INT4 => narrow::<i32, _>(value, ty)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::OID => narrow::<u32, _>(value, ty)?.to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => numeric_from_integer(value, out),
        _ => Err(format!("cannot write an integer into a column of type {ty}").into()),
    }
}

/// Strips domains down to the type whose wire format they share.
fn base_type(ty: &Type) -> &Type {
    match ty.kind() {
        Kind::Domain(base) => base_type(base),
        _ => ty,
    }
}

/// Whether a value of type `value` can be written as is into a column of type `column`.
///
/// Built-in types have the same OID in every database. User-defined types (enums, composites,
/// extension types) get a fresh OID in each one, so they are matched on schema and name.
fn same_type(value: &Type, column: &Type) -> bool {
    if Type::from_oid(value.oid()).is_some() || Type::from_oid(column.oid()).is_some() {
        return value.oid() == column.oid();
    }

    value.schema() == column.schema() && value.name() == column.name()
}

impl ToSql for Cell {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if let Kind::Domain(base) = ty.kind() {
            return self.to_sql(base, out);
        }

        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(value) => value.to_sql_checked(ty, out),
            Cell::String(value) => value.to_sql_checked(ty, out),
            Cell::I16(value) => integer_to_sql(i64::from(*value), ty, out),
            Cell::I32(value) => integer_to_sql(i64::from(*value), ty, out),
            Cell::U32(value) => integer_to_sql(i64::from(*value), ty, out),
            Cell::I64(value) => integer_to_sql(*value, ty, out),
            Cell::F32(value) if *ty == Type::FLOAT8 => f64::from(*value).to_sql(ty, out),
            Cell::F32(value) => value.to_sql_checked(ty, out),
            Cell::F64(value) => value.to_sql_checked(ty, out),
            Cell::Date(value) => value.to_sql_checked(ty, out),
            Cell::Time(value) => value.to_sql_checked(ty, out),
            Cell::Timestamp(value) => value.to_sql_checked(ty, out),
            Cell::TimestampTz(value) => value.to_sql_checked(ty, out),
            Cell::Uuid(value) => value.to_sql_checked(ty, out),
            Cell::Json(value) => value.to_sql_checked(ty, out),
            Cell::Bytes(value) => value.to_sql_checked(ty, out),
            Cell::Array(value) => value.to_sql(ty, out),
            Cell::Raw { ty: raw_ty, bytes } => {
                if !same_type(base_type(raw_ty), ty) {
                    return Err(format!(
                        "cannot write a {raw_ty} value into a column of type {ty}"
                    )
                    .into());
                }

                out.put_slice(bytes);
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl ToSql for ArrayCell {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            ArrayCell::Bool(values) => values.to_sql_checked(ty, out),
            ArrayCell::String(values) => values.to_sql_checked(ty, out),
            ArrayCell::I16(values) => values.to_sql_checked(ty, out),
            ArrayCell::I32(values) => values.to_sql_checked(ty, out),
            ArrayCell::U32(values) => values.to_sql_checked(ty, out),
            ArrayCell::I64(values) => values.to_sql_checked(ty, out),
            ArrayCell::F32(values) => values.to_sql_checked(ty, out),
            ArrayCell::F64(values) => values.to_sql_checked(ty, out),
            ArrayCell::Date(values) => values.to_sql_checked(ty, out),
            ArrayCell::Time(values) => values.to_sql_checked(ty, out),
            ArrayCell::Timestamp(values) => values.to_sql_checked(ty, out),
            ArrayCell::TimestampTz(values) => values.to_sql_checked(ty, out),
            ArrayCell::Uuid(values) => values.to_sql_checked(ty, out),
            ArrayCell::Json(values) => values.to_sql_checked(ty, out),
            ArrayCell::Bytes(values) => values.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
