use crate::{Error, FieldKind, Result};
use rust_decimal::Decimal;
use std::fmt::Write;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

/// Dynamically typed value moving between native Rust types, filter literals
/// and the JSON wire representation.
///
/// Every variant wraps an `Option` so a typed null (a null of a known field
/// kind) can be told apart from the untyped [`Value::Null`].
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Decimal(Option<Decimal>),
    Text(Option<String>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<OffsetDateTime>),
    /// Reference to binary content, carried as the service's container URL.
    Container(Option<String>),
}

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DATETIME_SUBSEC_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => v.is_none(),
            Value::Int(v) => v.is_none(),
            Value::Float(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Text(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Container(v) => v.is_none(),
        }
    }

    /// Whether this value can live in a field of the given kind.
    ///
    /// Calculated fields are read-only projections, any shape is accepted.
    pub fn matches_kind(&self, kind: FieldKind) -> bool {
        if self.is_null() {
            return true;
        }
        match kind {
            FieldKind::Text => matches!(self, Value::Text(..)),
            FieldKind::Number => matches!(
                self,
                Value::Int(..) | Value::Float(..) | Value::Decimal(..) | Value::Bool(..)
            ),
            FieldKind::Date => matches!(self, Value::Date(..)),
            FieldKind::Time => matches!(self, Value::Time(..)),
            FieldKind::Timestamp => matches!(self, Value::Timestamp(..)),
            FieldKind::Container => matches!(self, Value::Container(..) | Value::Text(..)),
            FieldKind::Calculated => true,
        }
    }

    /// Decode a JSON wire value into the representation declared for `kind`.
    pub fn from_json(kind: FieldKind, json: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        if json.is_null() {
            return Ok(kind.null_value());
        }
        let mismatch = || {
            Error::validation(format!(
                "value `{json}` does not decode as a {kind} field"
            ))
        };
        match kind {
            FieldKind::Text => match json {
                Json::String(v) => Ok(Value::Text(Some(v.clone()))),
                _ => Err(mismatch()),
            },
            FieldKind::Number => match json {
                Json::Number(v) => {
                    if let Some(i) = v.as_i64() {
                        Ok(Value::Int(Some(i)))
                    } else if let Some(f) = v.as_f64() {
                        Ok(Value::Float(Some(f)))
                    } else {
                        Err(mismatch())
                    }
                }
                // Services running in IEEE754 compatible mode send wide
                // numbers as strings.
                Json::String(v) => v
                    .parse::<Decimal>()
                    .map(|d| Value::Decimal(Some(d)))
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            FieldKind::Date => match json {
                Json::String(v) => Date::parse(v, DATE_FORMAT)
                    .map(|d| Value::Date(Some(d)))
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            FieldKind::Time => match json {
                Json::String(v) => Time::parse(v, TIME_FORMAT)
                    .map(|t| Value::Time(Some(t)))
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            FieldKind::Timestamp => match json {
                Json::String(v) => parse_strict_datetime(v).ok_or_else(mismatch).map(|t| {
                    Value::Timestamp(Some(t))
                }),
                _ => Err(mismatch()),
            },
            FieldKind::Container => match json {
                Json::String(v) => Ok(Value::Container(Some(v.clone()))),
                _ => Err(mismatch()),
            },
            FieldKind::Calculated => Ok(match json {
                Json::Bool(v) => Value::Bool(Some(*v)),
                Json::Number(v) => {
                    if let Some(i) = v.as_i64() {
                        Value::Int(Some(i))
                    } else {
                        Value::Float(v.as_f64())
                    }
                }
                Json::String(v) => Value::Text(Some(v.clone())),
                other => Value::Text(Some(other.to_string())),
            }),
        }
    }

    /// Encode into the JSON wire representation.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            v if v.is_null() => Json::Null,
            Value::Bool(Some(v)) => Json::Bool(*v),
            Value::Int(Some(v)) => Json::from(*v),
            Value::Float(Some(v)) => {
                serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number)
            }
            Value::Decimal(Some(v)) => Json::String(v.to_string()),
            Value::Text(Some(v)) => Json::String(v.clone()),
            Value::Date(Some(v)) => Json::String(format_date(v)),
            Value::Time(Some(v)) => Json::String(format_time(v)),
            Value::Timestamp(Some(v)) => Json::String(format_timestamp(v)),
            Value::Container(Some(v)) => Json::String(v.clone()),
            _ => Json::Null,
        }
    }
}

pub(crate) fn format_date(value: &Date) -> String {
    let mut out = String::with_capacity(10);
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month() as u8,
        value.day()
    );
    out
}

pub(crate) fn format_time(value: &Time) -> String {
    let mut out = String::with_capacity(8);
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        value.hour(),
        value.minute(),
        value.second()
    );
    out
}

pub(crate) fn format_timestamp(value: &OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}

/// Parse a string carrying both a date and a time component.
///
/// Accepts RFC 3339 with an offset, or a bare `YYYY-MM-DDThh:mm:ss[.sub]`
/// which is taken as UTC. Anything less (date only, dangling `T`) fails.
pub(crate) fn parse_strict_datetime(text: &str) -> Option<OffsetDateTime> {
    if let Ok(v) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(v);
    }
    PrimitiveDateTime::parse(text, DATETIME_SUBSEC_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(text, DATETIME_FORMAT))
        .map(PrimitiveDateTime::assume_utc)
        .ok()
}

/// Strings that pass this check render as unquoted date-time literals in
/// filter expressions. Deliberately strict: a date-only string or a malformed
/// timestamp stays an ordinary quoted string.
pub(crate) fn is_strict_datetime(text: &str) -> bool {
    parse_strict_datetime(text).is_some()
}

macro_rules! impl_into_value {
    ($source:ty => $variant:ident) => {
        impl From<$source> for Value {
            fn from(value: $source) -> Self {
                Value::$variant(Some(value.into()))
            }
        }
        impl From<Option<$source>> for Value {
            fn from(value: Option<$source>) -> Self {
                Value::$variant(value.map(Into::into))
            }
        }
    };
}

impl_into_value!(bool => Bool);
impl_into_value!(i8 => Int);
impl_into_value!(i16 => Int);
impl_into_value!(i32 => Int);
impl_into_value!(i64 => Int);
impl_into_value!(u8 => Int);
impl_into_value!(u16 => Int);
impl_into_value!(u32 => Int);
impl_into_value!(f32 => Float);
impl_into_value!(f64 => Float);
impl_into_value!(Decimal => Decimal);
impl_into_value!(String => Text);
impl_into_value!(&str => Text);
impl_into_value!(Date => Date);
impl_into_value!(Time => Time);
impl_into_value!(OffsetDateTime => Timestamp);

impl From<PrimitiveDateTime> for Value {
    fn from(value: PrimitiveDateTime) -> Self {
        Value::Timestamp(Some(value.assume_utc()))
    }
}

impl From<Option<PrimitiveDateTime>> for Value {
    fn from(value: Option<PrimitiveDateTime>) -> Self {
        Value::Timestamp(value.map(PrimitiveDateTime::assume_utc))
    }
}
